//! Subcommands and their dispatch onto `holmes_api`.

use std::io::Read as _;

use anyhow::Context as _;
use clap::{Args, Subcommand};
use holmes_api::{
  ApiError, limiters, pages,
  limiters::UpsertLimiterBody,
  reviews, workers,
};
use holmes_core::{
  Classify,
  limiter::MemoryCounter,
  review::{Fact, Violation},
};
use holmes_store_sqlite::SqliteStore;
use serde::Serialize;
use uuid::Uuid;

use crate::settings::Settings;

// ─── CLI shape ────────────────────────────────────────────────────────────────

#[derive(Subcommand)]
pub enum Command {
  /// Register and inspect monitored pages.
  #[command(subcommand)]
  Page(PageCommand),
  /// Create, fill, complete and read reviews.
  #[command(subcommand)]
  Review(ReviewCommand),
  /// Manage per-URL rate limits.
  #[command(subcommand)]
  Limiter(LimiterCommand),
  /// Worker registry.
  #[command(subcommand)]
  Worker(WorkerCommand),
}

#[derive(Subcommand)]
pub enum PageCommand {
  Add { domain: String, url: String },
  Show { page: String },
  /// Every review of the page, newest first.
  Reviews { page: String },
}

#[derive(Subcommand)]
pub enum ReviewCommand {
  Get {
    page:   String,
    review: String,
  },
  /// Record a finished review from a `{"facts": [..], "violations": [..]}`
  /// payload. Reads the payload from stdin when given `-`.
  Submit {
    page:    String,
    payload: String,
  },
  /// Open an empty review to be filled with `fact` and `violation`.
  Create { page: String },
  Fact(FactArgs),
  Violation(ViolationArgs),
  Complete {
    page:   String,
    review: String,
  },
  /// Most recently completed active reviews.
  Last {
    #[arg(short, long)]
    limit: Option<usize>,
  },
}

#[derive(Args)]
pub struct FactArgs {
  review:    String,
  #[arg(long)]
  key:       String,
  /// JSON value; anything that is not valid JSON is stored as a string.
  #[arg(long)]
  value:     String,
  #[arg(long)]
  title:     String,
  #[arg(long, default_value = "value")]
  unit:      String,
}

#[derive(Args)]
pub struct ViolationArgs {
  review:      String,
  #[arg(long)]
  key:         String,
  #[arg(long)]
  title:       String,
  #[arg(long)]
  description: String,
  #[arg(long)]
  points:      i64,
}

#[derive(Subcommand)]
pub enum LimiterCommand {
  /// Every rule with its current usage.
  List,
  Upsert {
    #[arg(long)]
    url:   Option<String>,
    #[arg(long)]
    value: Option<i64>,
  },
}

#[derive(Subcommand)]
pub enum WorkerCommand {
  /// Register or refresh a worker. A fresh UUID is used when none is given.
  Ping { worker: Option<String> },
  /// Set the worker's current review, or clear it when no review is given.
  Assign {
    worker: String,
    review: Option<String>,
  },
  Show { worker: String },
  List,
}

// ─── Dispatch ────────────────────────────────────────────────────────────────

pub async fn run(
  command: Command,
  store: &SqliteStore,
  counter: &MemoryCounter,
  settings: &Settings,
) -> anyhow::Result<()> {
  match command {
    Command::Page(cmd) => match cmd {
      PageCommand::Add { domain, url } => emit(pages::add_page(store, &domain, &url).await),
      PageCommand::Show { page } => emit(pages::get_page(store, &page).await),
      PageCommand::Reviews { page } => emit(pages::page_reviews(store, &page).await),
    },

    Command::Review(cmd) => match cmd {
      ReviewCommand::Get { page, review } => {
        emit(reviews::get_review(store, &page, &review).await)
      }
      ReviewCommand::Submit { page, payload } => {
        let payload = read_payload(payload)?;
        emit(reviews::create_review(store, &page, &payload).await)
      }
      ReviewCommand::Create { page } => emit(reviews::open_review(store, &page).await),
      ReviewCommand::Fact(args) => {
        let value = serde_json::from_str(&args.value)
          .unwrap_or(serde_json::Value::String(args.value));
        let fact = Fact { key: args.key, value, title: args.title, unit: args.unit };
        emit(reviews::add_fact(store, &args.review, fact).await)
      }
      ReviewCommand::Violation(args) => {
        let violation = Violation {
          key:         args.key,
          title:       args.title,
          description: args.description,
          points:      args.points,
        };
        emit(reviews::add_violation(store, &args.review, violation).await)
      }
      ReviewCommand::Complete { page, review } => {
        emit(reviews::complete_review(store, &page, &review).await)
      }
      ReviewCommand::Last { limit } => {
        let limit = limit.unwrap_or(settings.last_reviews_limit);
        emit(reviews::list_last_reviews(store, limit).await)
      }
    },

    Command::Limiter(cmd) => match cmd {
      LimiterCommand::List => emit(limiters::list_limiters(store, counter).await),
      LimiterCommand::Upsert { url, value } => {
        emit(limiters::upsert_limiter(store, UpsertLimiterBody { url, value }).await)
      }
    },

    Command::Worker(cmd) => match cmd {
      WorkerCommand::Ping { worker } => {
        let worker = worker.unwrap_or_else(|| Uuid::new_v4().to_string());
        emit(workers::ping(store, &worker).await)
      }
      WorkerCommand::Assign { worker, review } => {
        emit(workers::assign(store, &worker, review.as_deref()).await)
      }
      WorkerCommand::Show { worker } => emit(workers::get_worker(store, &worker).await),
      WorkerCommand::List => emit(workers::list_workers(store).await),
    },
  }
}

/// Print a successful result as JSON, or fail with the error's class.
fn emit<T: Serialize>(result: holmes_api::Result<T>) -> anyhow::Result<()> {
  let value = result.map_err(classified)?;
  println!("{}", serde_json::to_string_pretty(&value)?);
  Ok(())
}

fn classified(err: ApiError) -> anyhow::Error {
  let class = err.class();
  anyhow::Error::new(err).context(format!("{class} error"))
}

fn read_payload(arg: String) -> anyhow::Result<String> {
  if arg != "-" {
    return Ok(arg);
  }
  let mut payload = String::new();
  std::io::stdin()
    .read_to_string(&mut payload)
    .context("failed to read review payload from stdin")?;
  Ok(payload)
}
