//! CLI Status Command
//!
//! Queries `/api/health` on a local instance.

use anyhow::Result;

pub async fn run(port: u16) -> Result<()> {
    println!("docgate status: checking port {port}...");
    let client = reqwest::Client::new();
    match client
        .get(format!("http://localhost:{port}/api/health"))
        .send()
        .await
    {
        Ok(resp) => {
            let body: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
        Err(_) => {
            println!("docgate is not running on port {port}");
        }
    }
    Ok(())
}
