use log::{debug, error, info};
use reqwest::Client;

use super::{send, with_token};
use crate::error::{ClientError, Result};
use crate::models::auth::{LoginRequest, LoginResponse, RegisterRequest, User};

/// Exchanges credentials for a bearer token.
pub async fn login(client: &Client, base_url: &str, email: &str, password: &str) -> Result<String> {
    debug!("Logging in as {}", email);
    let url = format!("{}/auth/login", base_url);
    let request = LoginRequest {
        email: email.to_string(),
        password: password.to_string(),
    };
    let fallback = "Login failed";
    let resp = send(client.post(&url).json(&request), fallback).await?;

    match resp.json::<LoginResponse>().await {
        Ok(response) => {
            info!("Logged in successfully");
            Ok(response.access_token)
        }
        Err(e) => {
            error!("Login response unreadable: {}", e);
            Err(ClientError::Request(fallback.to_string()))
        }
    }
}

pub async fn register(
    client: &Client,
    base_url: &str,
    email: &str,
    username: &str,
    password: &str,
) -> Result<User> {
    let url = format!("{}/auth/register", base_url);
    let request = RegisterRequest {
        email: email.to_string(),
        username: username.to_string(),
        password: password.to_string(),
    };
    let fallback = "Registration failed";
    let resp = send(client.post(&url).json(&request), fallback).await?;

    match resp.json::<User>().await {
        Ok(user) => {
            info!("Registered user {}", user.username);
            Ok(user)
        }
        Err(e) => {
            error!("Registration response unreadable: {}", e);
            Err(ClientError::Request(fallback.to_string()))
        }
    }
}

pub async fn fetch_current_user(client: &Client, base_url: &str, token: &str) -> Result<User> {
    let url = format!("{}/auth/me", base_url);
    let fallback = "Failed to fetch user";
    let resp = send(with_token(client.get(&url), Some(token)), fallback).await?;

    resp.json::<User>().await.map_err(|e| {
        error!("User response unreadable: {}", e);
        ClientError::Request(fallback.to_string())
    })
}
