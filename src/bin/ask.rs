use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use mdrag::server::QuestionRequest;
use mdrag::Answer;
use reqwest::blocking::Client;

#[derive(Parser, Debug)]
#[command(
    name = "mdrag-ask",
    about = "Ask the mdrag API a question and print the grounded answer"
)]
struct AskCli {
    /// Question to answer from the indexed documents
    #[arg(long)]
    question: String,

    /// Chat endpoint of a running mdrag-api
    #[arg(long, env = "MDRAG_API_URL", default_value = "http://127.0.0.1:8000/chat")]
    api_url: String,

    /// Number of chunks to retrieve
    #[arg(long, default_value_t = mdrag::DEFAULT_TOP_K)]
    top_k: usize,

    /// Print one line per supporting chunk after the answer
    #[arg(long, default_value_t = false)]
    show_citations: bool,

    /// Seconds to wait for the API
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = AskCli::parse();
    let client = Client::builder()
        .timeout(Duration::from_secs(cli.timeout_secs.max(1)))
        .build()
        .context("failed to build API HTTP client")?;
    let answer = ask(&client, &cli.api_url, &cli.question, cli.top_k)?;

    println!("--- Answer ---\n{}", answer.answer.trim());
    if cli.show_citations {
        println!("\n--- Citations ---");
        for citation in &answer.citations {
            println!(
                "[{}] {} ({:.4})",
                citation.chunk_id, citation.title, citation.distance
            );
        }
    }
    Ok(())
}

fn ask(client: &Client, url: &str, question: &str, top_k: usize) -> Result<Answer> {
    let request = QuestionRequest {
        question: question.to_string(),
        top_k: Some(top_k),
    };
    let resp = client
        .post(url)
        .json(&request)
        .send()
        .with_context(|| format!("failed to call mdrag api at {url}"))?;
    if !resp.status().is_success() {
        let status = resp.status();
        let body = resp
            .text()
            .unwrap_or_else(|_| "<body unavailable>".to_string());
        bail!("mdrag api returned {}: {}", status, body);
    }
    resp.json().context("failed to parse mdrag api response")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_is_well_formed() {
        AskCli::command().debug_assert();
    }
}
