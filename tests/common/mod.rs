// In-memory forum API used by the integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use forum_client::error::{ClientError, ClientResult};
use forum_client::Transport;
use reqwest::{Method, StatusCode};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
pub struct Recorded {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Default)]
struct State {
    users: HashMap<String, String>,
    posts: Vec<Value>,
    comments: Vec<Value>,
    next_id: u64,
    log: Vec<Recorded>,
    /// (method, path) pairs that answer with a 503 instead
    failing: Vec<(Method, String)>,
}

/// Behaves like the forum server: posts, comments, votes and auth.
#[derive(Default)]
pub struct FakeForum {
    state: Mutex<State>,
}

impl FakeForum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, password: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .users
            .insert(username.to_string(), password.to_string());
        self
    }

    pub fn seed_post(&self, id: &str, title: &str, body: &str, votes: i64) {
        self.state.lock().unwrap().posts.push(json!({
            "_id": id,
            "title": title,
            "body": body,
            "user": { "username": "seed" },
            "votes": votes,
        }));
    }

    pub fn seed_comment(&self, id: &str, post_id: &str, body: &str) {
        self.state.lock().unwrap().comments.push(json!({
            "_id": id,
            "body": body,
            "user": { "username": "seed" },
            "post": post_id,
        }));
    }

    /// Make `method path` fail with 503 until [`FakeForum::recover`].
    pub fn fail(&self, method: Method, path: &str) {
        self.state
            .lock()
            .unwrap()
            .failing
            .push((method, path.to_string()));
    }

    pub fn recover(&self) {
        self.state.lock().unwrap().failing.clear();
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.state.lock().unwrap().log.clone()
    }

    pub fn count(&self, method: Method, path: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|r| r.method == method && r.path == path)
            .count()
    }

    pub fn post_ids(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .posts
            .iter()
            .map(|p| p["_id"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    fn handle(state: &mut State, method: &Method, path: &str, body: Option<&Value>) -> ClientResult<Value> {
        let segments: Vec<&str> = path.trim_matches('/').split('/').collect();
        let field = |name: &str| {
            body.and_then(|b| b.get(name))
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        match (method.as_str(), segments.as_slice()) {
            ("POST", ["auth", "login"]) => {
                let (username, password) = (field("username"), field("password"));
                if state.users.get(&username) == Some(&password) {
                    Ok(json!({ "token": format!("token-{}", username) }))
                } else {
                    Err(ClientError::from_status(
                        StatusCode::BAD_REQUEST,
                        "Invalid credentials".into(),
                    ))
                }
            }
            ("POST", ["auth", "register"]) => {
                let username = field("username");
                if state.users.contains_key(&username) {
                    return Err(ClientError::from_status(
                        StatusCode::BAD_REQUEST,
                        "User already exists".into(),
                    ));
                }
                state.users.insert(username.clone(), field("password"));
                Ok(json!({ "token": format!("token-{}", username) }))
            }
            ("GET", ["posts"]) => Ok(Value::Array(state.posts.clone())),
            ("POST", ["posts"]) => {
                state.next_id += 1;
                let post = json!({
                    "_id": format!("new{}", state.next_id),
                    "title": field("title"),
                    "body": field("body"),
                    "user": { "username": "me" },
                    "votes": 0,
                });
                state.posts.push(post.clone());
                Ok(post)
            }
            ("PUT", ["posts", id]) => {
                let post = find_post(state, id)?;
                post["title"] = json!(field("title"));
                post["body"] = json!(field("body"));
                Ok(post.clone())
            }
            ("DELETE", ["posts", id]) => {
                find_post(state, id)?;
                state.posts.retain(|p| p["_id"] != *id);
                Ok(json!({ "message": "Post deleted" }))
            }
            ("POST", ["posts", id, direction @ ("upvote" | "downvote")]) => {
                let delta = if *direction == "upvote" { 1 } else { -1 };
                let post = find_post(state, id)?;
                let votes = post["votes"].as_i64().unwrap_or_default() + delta;
                post["votes"] = json!(votes);
                Ok(post.clone())
            }
            ("GET", ["posts", id, "comments"]) => Ok(Value::Array(
                state
                    .comments
                    .iter()
                    .filter(|c| c["post"] == *id)
                    .cloned()
                    .collect(),
            )),
            ("POST", ["posts", id, "comments"]) => {
                find_post(state, id)?;
                state.next_id += 1;
                let comment = json!({
                    "_id": format!("c{}", state.next_id),
                    "body": field("body"),
                    "user": { "username": "me" },
                    "post": id,
                });
                state.comments.push(comment.clone());
                Ok(comment)
            }
            ("DELETE", ["comments", id]) => {
                let before = state.comments.len();
                state.comments.retain(|c| c["_id"] != *id);
                if state.comments.len() == before {
                    return Err(ClientError::from_status(
                        StatusCode::NOT_FOUND,
                        "Comment not found".into(),
                    ));
                }
                Ok(Value::Null)
            }
            _ => Err(ClientError::from_status(StatusCode::NOT_FOUND, "No route".into())),
        }
    }
}

fn find_post<'a>(state: &'a mut State, id: &str) -> ClientResult<&'a mut Value> {
    state
        .posts
        .iter_mut()
        .find(|p| p["_id"] == id)
        .ok_or_else(|| ClientError::from_status(StatusCode::NOT_FOUND, "Post not found".into()))
}

#[async_trait]
impl Transport for FakeForum {
    async fn send(&self, method: Method, path: &str, body: Option<Value>) -> ClientResult<Value> {
        let mut state = self.state.lock().unwrap();
        state.log.push(Recorded {
            method: method.clone(),
            path: path.to_string(),
            body: body.clone(),
        });
        if state
            .failing
            .iter()
            .any(|(m, p)| *m == method && p == path)
        {
            return Err(ClientError::from_status(
                StatusCode::SERVICE_UNAVAILABLE,
                String::new(),
            ));
        }
        Self::handle(&mut state, &method, path, body.as_ref())
    }
}
