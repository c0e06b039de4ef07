//! Marketplace pricing - evaluate markup rules from the command line.
//!
//! Reads requests as JSON on stdin and writes results as JSON on stdout:
//!
//! - `marketplace-pricing [evaluate]`: one or many `PriceRequest`s → evaluations
//! - `marketplace-pricing breaks`: one or many `PriceRequest`s → price-break tables
//! - `marketplace-pricing cart`: an array of cart lines → a cart quote

use anyhow::{bail, Context, Result};
use marketplace_pricing::config::Config;
use marketplace_pricing::{Cart, CartItem, InMemoryRuleRepository, Money, PriceRequest, Quantity, RuleRepository};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Requests { One(PriceRequest), Many(Vec<PriceRequest>) }

impl Requests {
    fn into_vec(self) -> Vec<PriceRequest> {
        match self { Self::One(r) => vec![r], Self::Many(rs) => rs }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartLine { product_id: String, category_name: String, #[serde(default)] name: Option<String>, quantity: i64, base_price: Decimal }

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env()?;
    let repo = InMemoryRuleRepository::load_json(&config.rules_path)
        .with_context(|| format!("loading pricing rules from {}", config.rules_path.display()))?;
    let snapshot = repo.snapshot()?;
    let now = config.now();

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input).context("reading stdin")?;

    let command = std::env::args().nth(1).unwrap_or_else(|| "evaluate".to_string());
    let run_id = Uuid::now_v7();
    tracing::info!(%run_id, %command, rules = snapshot.rules().len(), %now, "pricing run");

    let output = match command.as_str() {
        "evaluate" => {
            let requests = serde_json::from_str::<Requests>(&input).context("parsing price requests")?.into_vec();
            let results = requests.iter().map(|request| match snapshot.evaluate(request, now) {
                Ok(evaluation) => serde_json::to_value(evaluation),
                Err(e) => Ok(serde_json::json!({ "productId": request.product_id, "error": e.to_string() })),
            });
            serde_json::Value::Array(results.collect::<std::result::Result<_, _>>()?)
        }
        "breaks" => {
            let requests = serde_json::from_str::<Requests>(&input).context("parsing price requests")?.into_vec();
            let results = requests.iter().map(|request| match snapshot.price_breaks(request, now) {
                Ok(breaks) => Ok(serde_json::json!({ "productId": request.product_id, "priceBreaks": breaks })),
                Err(e) => Ok::<_, serde_json::Error>(serde_json::json!({ "productId": request.product_id, "error": e.to_string() })),
            });
            serde_json::Value::Array(results.collect::<std::result::Result<_, _>>()?)
        }
        "cart" => {
            let lines: Vec<CartLine> = serde_json::from_str(&input).context("parsing cart lines")?;
            let mut cart = Cart::new(&config.currency);
            for line in lines {
                cart.add_item(CartItem {
                    name: line.name.unwrap_or_else(|| line.product_id.clone()),
                    product_id: line.product_id,
                    category_name: line.category_name,
                    quantity: Quantity::normalized(Some(line.quantity)),
                    base_price: Money::new(line.base_price, &config.currency),
                })?;
            }
            serde_json::to_value(cart.quote(&snapshot, now)?)?
        }
        other => bail!("unknown command {other:?}, expected evaluate, breaks or cart"),
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
