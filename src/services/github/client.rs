use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use url::Url;

use crate::config::Secret;
use crate::services::github::{
    Branch, GitHubError, GitHubResult, SourceControl, is_valid_branch_name,
};

// Tried in order when picking the base for a new branch.
const BASE_BRANCH_CANDIDATES: [&str; 2] = ["main", "master"];

const USER_AGENT: &str = concat!("slack-git-relay/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client bound to a single repository.
#[derive(Clone)]
pub struct GitHubClient {
    http: reqwest::Client,
    api_url: Url,
    owner: String,
    repo: String,
    token: Secret,
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_url", &self.api_url.as_str())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct RefResponse {
    object: RefObject,
}

#[derive(Debug, Deserialize)]
struct RefObject {
    sha: String,
}

#[derive(Debug, Serialize)]
struct CreateRefRequest<'a> {
    #[serde(rename = "ref")]
    reference: String,
    sha: &'a str,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    name: String,
    commit: BranchCommit,
}

#[derive(Debug, Deserialize)]
struct BranchCommit {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    #[serde(default)]
    message: String,
}

impl GitHubClient {
    pub fn new(
        http: reqwest::Client,
        api_url: &Url,
        owner: &str,
        repo: &str,
        token: Secret,
    ) -> Self {
        Self {
            http,
            api_url: api_url.clone(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            token,
        }
    }

    /// `{api_url}/repos/{owner}/{repo}/` followed by `path`, one segment each.
    ///
    /// Every segment is percent-encoded on its own, so user input can only
    /// ever add path segments below the repository.
    fn endpoint<'a>(&self, path: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        // Config only accepts http(s) base URLs, which always have path segments.
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["repos", self.owner.as_str(), self.repo.as_str()])
                .extend(path);
        }
        url
    }

    fn request<'a>(
        &self,
        method: reqwest::Method,
        path: impl IntoIterator<Item = &'a str>,
    ) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.endpoint(path))
            .header("Authorization", format!("token {}", self.token.expose()))
            .header("Accept", "application/vnd.github.v3+json")
            .header("User-Agent", USER_AGENT)
    }

    /// SHA of the first existing base branch candidate.
    async fn base_sha(&self) -> GitHubResult<(String, String)> {
        for base in BASE_BRANCH_CANDIDATES {
            let res = self
                .request(reqwest::Method::GET, ["git", "refs", "heads", base])
                .send()
                .await?;

            if res.status() == StatusCode::NOT_FOUND {
                debug!(base, "base branch candidate not found");
                continue;
            }

            let body: RefResponse = ensure_success(res).await?.json().await?;
            return Ok((base.to_string(), body.object.sha));
        }
        Err(GitHubError::NoBaseBranch)
    }
}

#[async_trait]
impl SourceControl for GitHubClient {
    async fn create_branch(&self, name: &str) -> GitHubResult<String> {
        ensure_valid_name(name)?;
        let (base, sha) = self.base_sha().await?;

        let res = self
            .request(reqwest::Method::POST, ["git", "refs"])
            .json(&CreateRefRequest {
                reference: format!("refs/heads/{name}"),
                sha: &sha,
            })
            .send()
            .await?;

        if res.status() == StatusCode::UNPROCESSABLE_ENTITY {
            let message = error_message(res).await;
            if message.contains("Reference already exists") {
                return Err(GitHubError::AlreadyExists(name.to_string()));
            }
            return Err(GitHubError::Rejected(message));
        }

        ensure_success(res).await?;
        info!(branch = name, base = %base, "created branch");
        Ok(base)
    }

    async fn list_branches(&self) -> GitHubResult<Vec<Branch>> {
        let res = self
            .request(reqwest::Method::GET, ["branches"])
            .query(&[("per_page", "100")])
            .send()
            .await?;

        let branches: Vec<BranchResponse> = ensure_success(res).await?.json().await?;
        Ok(branches
            .into_iter()
            .map(|b| Branch {
                name: b.name,
                sha: b.commit.sha,
            })
            .collect())
    }

    async fn delete_branch(&self, name: &str) -> GitHubResult<()> {
        ensure_valid_name(name)?;
        let path = ["git", "refs", "heads"].into_iter().chain(name.split('/'));
        let res = self
            .request(reqwest::Method::DELETE, path)
            .send()
            .await?;

        // GitHub answers 422 "Reference does not exist" for unknown refs.
        if matches!(
            res.status(),
            StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY
        ) {
            return Err(GitHubError::NotFound(name.to_string()));
        }

        ensure_success(res).await?;
        info!(branch = name, "deleted branch");
        Ok(())
    }
}

fn ensure_valid_name(name: &str) -> GitHubResult<()> {
    if is_valid_branch_name(name) {
        Ok(())
    } else {
        Err(GitHubError::InvalidName(name.to_string()))
    }
}

async fn ensure_success(res: Response) -> GitHubResult<Response> {
    if res.status().is_success() {
        return Ok(res);
    }
    let status = res.status().as_u16();
    let message = error_message(res).await;
    Err(GitHubError::Api { status, message })
}

async fn error_message(res: Response) -> String {
    let text = res.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorResponse>(&text) {
        Ok(body) if !body.message.is_empty() => body.message,
        _ if text.is_empty() => "Unknown error".to_string(),
        _ => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::{Mock, MockServer, ResponseTemplate, matchers};

    async fn client(server: &MockServer) -> GitHubClient {
        let url = Url::parse(&server.uri()).unwrap();
        GitHubClient::new(
            reqwest::Client::new(),
            &url,
            "octo",
            "repo",
            Secret::new("ghp_test"),
        )
    }

    fn ref_body(sha: &str) -> serde_json::Value {
        json!({ "ref": "refs/heads/main", "object": { "sha": sha, "type": "commit" } })
    }

    #[tokio::test]
    async fn create_branch_from_main() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/repos/octo/repo/git/refs/heads/main"))
            .and(matchers::header("Authorization", "token ghp_test"))
            .and(matchers::header("Accept", "application/vnd.github.v3+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body("abc123")))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/repos/octo/repo/git/refs"))
            .and(matchers::body_json(json!({
                "ref": "refs/heads/feature-x",
                "sha": "abc123"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let base = client(&server).await.create_branch("feature-x").await.unwrap();
        assert_eq!(base, "main");
    }

    #[tokio::test]
    async fn create_branch_falls_back_to_master() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/repos/octo/repo/git/refs/heads/main"))
            .respond_with(
                ResponseTemplate::new(404).set_body_json(json!({"message": "Not Found"})),
            )
            .mount(&server)
            .await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/repos/octo/repo/git/refs/heads/master"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body("def456")))
            .mount(&server)
            .await;

        Mock::given(matchers::method("POST"))
            .and(matchers::path("/repos/octo/repo/git/refs"))
            .and(matchers::body_json(json!({
                "ref": "refs/heads/hotfix",
                "sha": "def456"
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let base = client(&server).await.create_branch("hotfix").await.unwrap();
        assert_eq!(base, "master");
    }

    #[tokio::test]
    async fn create_branch_without_any_base() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = client(&server).await.create_branch("x").await.unwrap_err();
        assert!(matches!(err, GitHubError::NoBaseBranch));
    }

    #[tokio::test]
    async fn create_branch_that_already_exists() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body("abc123")))
            .mount(&server)
            .await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "Reference already exists"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).await.create_branch("dup").await.unwrap_err();
        assert!(matches!(err, GitHubError::AlreadyExists(ref n) if n == "dup"));
    }

    #[tokio::test]
    async fn create_branch_other_validation_error() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(ref_body("abc123")))
            .mount(&server)
            .await;

        Mock::given(matchers::method("POST"))
            .respond_with(
                ResponseTemplate::new(422).set_body_json(json!({"message": "Invalid request"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .create_branch("bad-name")
            .await
            .unwrap_err();
        assert!(matches!(err, GitHubError::Rejected(ref m) if m == "Invalid request"));
    }

    #[tokio::test]
    async fn base_lookup_server_error_is_reported() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"message": "Bad credentials"})),
            )
            .mount(&server)
            .await;

        let err = client(&server).await.create_branch("x").await.unwrap_err();
        match err {
            GitHubError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Bad credentials");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn list_branches_parses_names_and_shas() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("GET"))
            .and(matchers::path("/repos/octo/repo/branches"))
            .and(matchers::query_param("per_page", "100"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "name": "main", "commit": { "sha": "1111111aaaa" }, "protected": true },
                { "name": "dev", "commit": { "sha": "2222222bbbb" }, "protected": false }
            ])))
            .mount(&server)
            .await;

        let branches = client(&server).await.list_branches().await.unwrap();
        assert_eq!(
            branches,
            vec![
                Branch {
                    name: "main".into(),
                    sha: "1111111aaaa".into(),
                },
                Branch {
                    name: "dev".into(),
                    sha: "2222222bbbb".into(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn delete_branch_success_and_missing() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("DELETE"))
            .and(matchers::path("/repos/octo/repo/git/refs/heads/old"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(matchers::method("DELETE"))
            .and(matchers::path("/repos/octo/repo/git/refs/heads/ghost"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(json!({"message": "Reference does not exist"})),
            )
            .mount(&server)
            .await;

        let c = client(&server).await;
        c.delete_branch("old").await.unwrap();
        let err = c.delete_branch("ghost").await.unwrap_err();
        assert!(matches!(err, GitHubError::NotFound(ref n) if n == "ghost"));
    }

    #[tokio::test]
    async fn delete_nested_branch_keeps_slashes_as_segments() {
        let server = MockServer::start().await;

        Mock::given(matchers::method("DELETE"))
            .and(matchers::path("/repos/octo/repo/git/refs/heads/feature/login"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .delete_branch("feature/login")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn invalid_names_never_reach_the_api() {
        let server = MockServer::start().await;

        Mock::given(matchers::any())
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let c = client(&server).await;
        for name in ["x/../main", "../../../collaborators/alice", "a?b", "%2e%2e/main"] {
            let err = c.delete_branch(name).await.unwrap_err();
            assert!(matches!(err, GitHubError::InvalidName(ref n) if n == name));

            let err = c.create_branch(name).await.unwrap_err();
            assert!(matches!(err, GitHubError::InvalidName(ref n) if n == name));
        }
    }
}
