//! Counter demo: sync and async handlers in front of a reducer
//!
//! Run with `RUST_LOG=reader_dispatch_core=debug` to see handler routing.

use std::time::Duration;

use clap::Parser;
use reader_dispatch::prelude::*;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Counter - reader-dispatch example
#[derive(Parser, Debug)]
#[command(name = "counter")]
#[command(about = "Drive a reducer store through registered handlers")]
struct Args {
    /// Amount passed as the ADD payload
    #[arg(long, short, default_value = "5")]
    add: i64,

    /// Bonus injected into the ADD handler's dependencies
    #[arg(long, short, default_value = "2")]
    bonus: i64,

    /// Delay of the async rename handler in milliseconds
    #[arg(long, default_value = "100")]
    delay_ms: u64,

    /// Log every action with its payload
    #[arg(long)]
    verbose: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
struct CountState {
    count: i64,
    name: String,
}

/// Payload shared by every action carrying a value
#[derive(Debug, Clone)]
enum CountPayload {
    Count(i64),
    Name(String),
}

impl From<i64> for CountPayload {
    fn from(n: i64) -> Self {
        CountPayload::Count(n)
    }
}

impl From<String> for CountPayload {
    fn from(name: String) -> Self {
        CountPayload::Name(name)
    }
}

#[derive(Action, Debug, Clone, Serialize)]
#[action(payload = "CountPayload", rename_all = "SCREAMING_SNAKE_CASE")]
enum CountAction {
    SetCount(i64),
    Add(i64),
    SetName(String),
    RunNameHandler,
}

fn reducer(state: &mut CountState, action: CountAction) -> bool {
    match action {
        CountAction::SetCount(n) => {
            state.count = n;
            true
        }
        CountAction::SetName(name) => {
            state.name = name;
            true
        }
        CountAction::Add(_) | CountAction::RunNameHandler => false,
    }
}

#[derive(Clone)]
struct CounterDeps {
    dispatch: Dispatcher<CountAction>,
    bonus: i64,
    delay: Duration,
}

impl Dependencies<CountAction> for CounterDeps {
    fn dispatcher(&self) -> &Dispatcher<CountAction> {
        &self.dispatch
    }
}

fn add(ctx: Context<CountPayload, CounterDeps>) -> Thunk {
    Thunk::new(move || {
        let amount = match ctx.payload {
            Some(CountPayload::Count(n)) => n,
            _ => 0,
        };
        let n = amount + ctx.dependencies.bonus;
        ctx.dependencies.dispatch(CountAction::SetCount(n));
    })
}

fn rename(ctx: Context<CountPayload, CounterDeps>) -> Thunk {
    Thunk::future(async move {
        tokio::time::sleep(ctx.dependencies.delay).await;
        ctx.dependencies
            .dispatch(CountAction::SetName("NewName".to_string()));
        Ok(())
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("reader_dispatch_core=info".parse()?),
        )
        .init();

    let args = Args::parse();
    let store = ReaderStore::new(CountState::default(), reducer);

    if args.verbose {
        store.session().add_middleware(LoggingMiddleware::verbose());
    }

    let (bonus, delay) = (args.bonus, Duration::from_millis(args.delay_ms));
    store.register_map_with(
        HandlerMap::<CountAction, CounterDeps>::new()
            .on("ADD", add)
            .on("RUN_NAME_HANDLER", rename),
        move |dispatch| CounterDeps {
            dispatch,
            bonus,
            delay,
        },
    )?;

    store.dispatch(CountAction::Add(args.add));
    store.dispatch(CountAction::RunNameHandler);

    let observed = store.observe().await?;
    tracing::info!(state = ?store.state(), "handlers settled");

    println!("{}", serde_json::to_string_pretty(&store.state())?);
    println!("{}", serde_json::to_string_pretty(&observed)?);

    Ok(())
}
