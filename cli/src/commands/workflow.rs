use icora_core::tool::ToolResult;
use serde_json::{Value, json};

use super::intent::{CreateIntentArgs, build_arguments};
use super::tools::{ConfigureAuthArgs, check_status};
use crate::util::{call_mcp_tool, to_pretty_json};

const STEPS: [&str; 3] = ["status_check", "auth_config", "intent_creation"];

/// Status check, auth configuration, then a `TestIntent`, stopping at the first failure.
pub async fn run_workflow(mcp_url: &str, wiremock_url: &str) -> Value {
    let mut completed: Vec<&str> = Vec::new();
    let mut results: Vec<Value> = Vec::new();

    for step in STEPS {
        let result = match step {
            "status_check" => check_status(mcp_url).await,
            "auth_config" => {
                let arguments = ConfigureAuthArgs::default().to_arguments(wiremock_url);
                call_mcp_tool(mcp_url, "icoraintent_configure_auth", arguments).await
            }
            _ => {
                let args = CreateIntentArgs {
                    name: Some("TestIntent".to_string()),
                    description: "Test workflow intent".to_string(),
                    ..CreateIntentArgs::default()
                };
                let arguments = build_arguments(&args, chrono::Utc::now().date_naive());
                call_mcp_tool(mcp_url, "icoraintent_create_intent", arguments).await
            }
        };
        results.push(json!({ "step": step, "outcome": result }));

        if let ToolResult::Error { error_message } = &result {
            return json!({
                "status": "error",
                "errorMessage": error_message,
                "stepFailed": step,
                "stepsCompleted": completed,
                "results": results,
            });
        }
        completed.push(step);
    }

    json!({
        "status": "success",
        "message": "Complete MCP workflow test passed",
        "testIntent": "TestIntent",
        "stepsCompleted": completed,
        "results": results,
    })
}

pub async fn run(mcp_url: &str, wiremock_url: &str) -> i32 {
    let report = run_workflow(mcp_url, wiremock_url).await;
    let ok = report["status"] == "success";
    if ok {
        println!("{}", to_pretty_json(&report));
        0
    } else {
        eprintln!("{}", to_pretty_json(&report));
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unreachable_mcp_fails_at_status_check() {
        let report = run_workflow("http://127.0.0.1:9", "http://127.0.0.1:9").await;
        assert_eq!(report["status"], "error");
        assert_eq!(report["stepFailed"], "status_check");
        assert_eq!(report["stepsCompleted"], json!([]));
    }
}
