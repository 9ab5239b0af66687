use log::info;
use reqwest::Client;
use serde_json::Value;

use super::{json_body, send, with_token};
use crate::error::Result;
use crate::models::poll::{OptionId, PollId};
use crate::models::requests::{CreatePollRequest, VoteRequest};

pub async fn fetch_polls(client: &Client, base_url: &str, token: Option<&str>) -> Result<Value> {
    let url = format!("{}/polls", base_url);
    let fallback = "Failed to fetch polls";
    let resp = send(with_token(client.get(&url), token), fallback).await?;
    let polls = json_body(resp, fallback).await?;
    info!("Polls received successfully");
    Ok(polls)
}

pub async fn fetch_poll(
    client: &Client,
    base_url: &str,
    poll_id: PollId,
    token: Option<&str>,
) -> Result<Value> {
    let url = format!("{}/polls/{}", base_url, poll_id);
    let fallback = "Failed to fetch poll";
    let resp = send(with_token(client.get(&url), token), fallback).await?;
    let poll = json_body(resp, fallback).await?;
    info!("Poll {} received successfully", poll_id);
    Ok(poll)
}

pub async fn create_poll(
    client: &Client,
    base_url: &str,
    request: &CreatePollRequest,
    token: &str,
) -> Result<Value> {
    let url = format!("{}/polls", base_url);
    let fallback = "Failed to create poll";
    let resp = send(with_token(client.post(&url).json(request), Some(token)), fallback).await?;
    let poll = json_body(resp, fallback).await?;
    info!("Poll created successfully");
    Ok(poll)
}

pub async fn vote_poll(
    client: &Client,
    base_url: &str,
    poll_id: PollId,
    option_id: OptionId,
    token: &str,
) -> Result<()> {
    let url = format!("{}/polls/{}/vote", base_url, poll_id);
    let request = client.post(&url).json(&VoteRequest { option_id });
    send(with_token(request, Some(token)), "Failed to vote").await?;
    info!("Vote for option {} on poll {} accepted", option_id, poll_id);
    Ok(())
}

pub async fn like_poll(client: &Client, base_url: &str, poll_id: PollId, token: &str) -> Result<()> {
    let url = format!("{}/polls/{}/like", base_url, poll_id);
    let request = client.post(&url).json(&serde_json::json!({}));
    send(with_token(request, Some(token)), "Failed to like poll").await?;
    info!("Poll {} liked", poll_id);
    Ok(())
}

pub async fn unlike_poll(
    client: &Client,
    base_url: &str,
    poll_id: PollId,
    token: &str,
) -> Result<()> {
    let url = format!("{}/polls/{}/like", base_url, poll_id);
    send(with_token(client.delete(&url), Some(token)), "Failed to unlike poll").await?;
    info!("Poll {} unliked", poll_id);
    Ok(())
}
