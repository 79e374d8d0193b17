use chrono::NaiveDate;
use clap::Args;
use icora_core::intent::{GeoPoint, IntentType};
use rand::Rng;
use serde_json::{Value, json};

use crate::util::{call_mcp_tool, print_result};

#[derive(Args, Default)]
pub struct CreateIntentArgs {
    /// Intent name (defaults to `Intent` plus a random number)
    #[arg(long)]
    pub name: Option<String>,
    /// Intent description
    #[arg(long, default_value = "Network intent created from the icora CLI")]
    pub description: String,
    /// Intent type
    #[arg(long, value_parser = parse_intent_type, default_value = "EventLiveBroadcast")]
    pub intent_type: IntentType,
    /// Validity start (defaults to today 00:00:00)
    #[arg(long)]
    pub start: Option<String>,
    /// Validity end (defaults to today 23:59:59)
    #[arg(long)]
    pub end: Option<String>,
    /// Service-area point as `lon,lat` (repeatable)
    #[arg(long = "point", value_parser = parse_point)]
    pub points: Vec<GeoPoint>,
}

fn parse_intent_type(raw: &str) -> Result<IntentType, String> {
    serde_json::from_value(json!(raw)).map_err(|_| {
        format!("unknown intent type '{raw}' (expected EventLiveBroadcast, VideoConference or DataTransfer)")
    })
}

fn parse_point(raw: &str) -> Result<GeoPoint, String> {
    let (lon, lat) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat but got '{raw}'"))?;
    let longitude: f64 = lon
        .trim()
        .parse()
        .map_err(|e| format!("invalid longitude '{lon}': {e}"))?;
    let latitude: f64 = lat
        .trim()
        .parse()
        .map_err(|e| format!("invalid latitude '{lat}': {e}"))?;
    Ok(GeoPoint {
        longitude,
        latitude,
    })
}

pub fn default_name() -> String {
    format!("Intent{}", rand::thread_rng().gen_range(1000..10000))
}

/// Tool arguments for `icoraintent_create_intent`, with validity defaulting to `today`.
pub fn build_arguments(args: &CreateIntentArgs, today: NaiveDate) -> Value {
    let day = today.format("%Y-%m-%d");
    let start = args
        .start
        .clone()
        .unwrap_or_else(|| format!("{day}T00:00:00"));
    let end = args.end.clone().unwrap_or_else(|| format!("{day}T23:59:59"));

    let mut arguments = json!({
        "name": args.name.clone().unwrap_or_else(default_name),
        "description": args.description,
        "intentType": args.intent_type.as_str(),
        "validFor": {
            "startDateTime": start,
            "endDateTime": end
        }
    });
    if !args.points.is_empty() {
        arguments["serviceArea"] = json!(args.points);
    }
    arguments
}

pub async fn create(mcp_url: &str, args: &CreateIntentArgs) -> i32 {
    let arguments = build_arguments(args, chrono::Utc::now().date_naive());
    print_result(&call_mcp_tool(mcp_url, "icoraintent_create_intent", arguments).await)
}
