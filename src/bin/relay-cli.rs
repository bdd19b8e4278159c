use clap::{Parser, Subcommand};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "relay-cli")]
#[command(about = "Talk to a running llm-relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Probe the liveness endpoint
    Health,
    /// Send a prompt through the relay
    Ask {
        prompt: String,
        #[arg(long)]
        model: Option<String>,
        #[arg(long)]
        max_tokens: Option<u32>,
        #[arg(long)]
        temperature: Option<f64>,
        /// Print only the first choice's message content
        #[arg(long)]
        content: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    match cli.command {
        Commands::Health => {
            let res = client.get(format!("{}/_health", base)).send().await?;
            let status = res.status();
            println!("{} {}", status, res.text().await?);
        }
        Commands::Ask { prompt, model, max_tokens, temperature, content } => {
            // Naming a model makes the relay forward the body as-is, so send
            // a complete chat payload in that case.
            let mut body = match model {
                Some(model) => json!({
                    "model": model,
                    "messages": [{"role": "user", "content": prompt}],
                }),
                None => json!({ "prompt": prompt }),
            };
            if let Some(max_tokens) = max_tokens {
                body["max_tokens"] = json!(max_tokens);
            }
            if let Some(temperature) = temperature {
                body["temperature"] = json!(temperature);
            }

            let res = client.post(format!("{}/api/myapi", base)).json(&body).send().await?;
            print_response(res, content).await?;
        }
    }

    Ok(())
}

async fn print_response(
    res: reqwest::Response,
    content_only: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if !status.is_success() {
        eprintln!("Error: relay returned status {}", status);
        eprintln!("Response: {}", text);
        return Ok(());
    }

    println!("{}", render_reply(&text, content_only)?);
    Ok(())
}

/// Pretty-print a relay reply; with `content_only`, just the assistant text
/// when the reply has one.
fn render_reply(text: &str, content_only: bool) -> Result<String, serde_json::Error> {
    let Ok(json) = serde_json::from_str::<Value>(text) else {
        return Ok(text.to_string());
    };

    if content_only {
        if let Some(content) = json.pointer("/choices/0/message/content").and_then(Value::as_str) {
            return Ok(content.to_string());
        }
    }
    serde_json::to_string_pretty(&json)
}
