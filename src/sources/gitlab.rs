//! GitLab project wiki

use crate::auth::AuthConfig;
use crate::config::{require_field, resolve_credentials, CredentialSource};
use crate::error::{Error, Result};
use crate::http::{HttpClient, HttpClientConfig, RequestConfig};
use crate::types::{JsonObject, JsonValue, TlsVerify};
use regex::Regex;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};
use url::Url;

/// Default credentials key
pub const DEFAULT_CREDENTIALS_KEY: &str = "Gitlab";

/// Everything up to and including the GitLab host
static GITLAB_HOST: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r".*gitlab\.[^/]*/").expect("valid regex"));

/// A wiki page as returned by the GitLab API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WikiPage {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub format: Option<String>,
    /// Absent when listing pages without content
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub encoding: Option<String>,
}

/// Split a repository URL into the GitLab root and the project path
///
/// `https://gitlab.example.com/group/project` becomes
/// (`https://gitlab.example.com/`, `group/project`).
pub fn split_repository_url(url: &str) -> Result<(String, String)> {
    let host = GITLAB_HOST
        .find(url)
        .ok_or_else(|| Error::invalid_value("url", format!("'{url}' is not a GitLab URL")))?
        .as_str();

    let project = url[host.len()..]
        .trim_matches('/')
        .trim_end_matches(".git")
        .to_string();
    if project.is_empty() {
        return Err(Error::invalid_value(
            "url",
            format!("'{url}' does not name a project"),
        ));
    }
    Ok((host.to_string(), project))
}

/// Client for one project's wiki
#[derive(Debug)]
pub struct GitlabWiki {
    http: HttpClient,
    api_base: Url,
    project: String,
}

impl GitlabWiki {
    /// Connect to the wiki of the repository at `url`
    ///
    /// Credentials come from `credentials` when given, otherwise from the
    /// `gitlab` entry of `source`; they must contain a `token`.
    pub fn new(
        url: &str,
        credentials: Option<&JsonObject>,
        source: &dyn CredentialSource,
        verify: TlsVerify,
    ) -> Result<Self> {
        let (host, project) = split_repository_url(url)?;
        let mapping = resolve_credentials(credentials, source, DEFAULT_CREDENTIALS_KEY)?;
        let token = require_field(&mapping, "token")?;
        Self::connect(&host, &project, token, verify)
    }

    /// Connect to `project` on the GitLab instance rooted at `host`
    pub fn connect(host: &str, project: &str, token: &str, verify: TlsVerify) -> Result<Self> {
        let api_base = Url::parse(host)?.join("api/v4/")?;
        let config = HttpClientConfig::builder().tls(verify).build();
        let http = HttpClient::with_auth(
            config,
            AuthConfig::Header {
                name: "PRIVATE-TOKEN".to_string(),
                value: token.to_string(),
            },
        )?;

        Ok(Self {
            http,
            api_base,
            project: project.to_string(),
        })
    }

    /// Project path, e.g. `group/project`
    pub fn project(&self) -> &str {
        &self.project
    }

    fn wiki_url(&self, slug: Option<&str>) -> Result<String> {
        let mut url = self.api_base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| Error::invalid_value("url", "GitLab URL cannot be a base"))?;
            segments
                .pop_if_empty()
                .extend(["projects", self.project.as_str(), "wikis"]);
            if let Some(slug) = slug {
                segments.push(slug);
            }
        }
        Ok(url.into())
    }

    /// Fetch a page with its content
    pub async fn get_page(&self, path: &str) -> Result<WikiPage> {
        let slug = normalize_slug(path)?;
        debug!("Fetching wiki page '{}' of {}", slug, self.project);
        self.http.get_json(&self.wiki_url(Some(slug))?).await
    }

    /// List all pages, without content
    pub async fn list_pages(&self) -> Result<Vec<WikiPage>> {
        self.http.get_json(&self.wiki_url(None)?).await
    }

    /// Content of a page; empty if the page has none
    pub async fn get_content(&self, path: &str) -> Result<String> {
        Ok(self.get_page(path).await?.content.unwrap_or_default())
    }

    /// Replace the content of an existing page
    ///
    /// With `file`, the file is uploaded as a wiki attachment and its
    /// markdown link is appended below `content`.
    pub async fn update_page(
        &self,
        path: &str,
        content: &str,
        file: Option<&Path>,
    ) -> Result<WikiPage> {
        let page = self.get_page(path).await?;

        let content = match file {
            Some(file) => {
                let link = self.upload_attachment(file).await?;
                format!("{content}\n\n{link}")
            }
            None => content.to_string(),
        };

        let updated: WikiPage = self
            .http
            .put_json(
                &self.wiki_url(Some(&page.slug))?,
                json!({ "content": content, "title": page.slug }),
            )
            .await?;
        info!("Updated wiki page '{}' of {}", updated.slug, self.project);
        Ok(updated)
    }

    /// Upload a file to the wiki, returning its markdown link
    pub async fn upload_attachment(&self, file: &Path) -> Result<String> {
        let bytes = std::fs::read(file).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::FileNotFound {
                path: file.display().to_string(),
            },
            _ => Error::Io(e),
        })?;
        let file_name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "attachment".to_string());

        let url = format!("{}/attachments", self.wiki_url(None)?);
        let response: JsonValue = self
            .http
            .request_json(
                Method::POST,
                &url,
                RequestConfig::new().file("file", file_name, bytes),
            )
            .await?;

        response
            .pointer("/link/markdown")
            .and_then(JsonValue::as_str)
            .map(String::from)
            .ok_or_else(|| Error::decode("Attachment response has no markdown link"))
    }
}

fn normalize_slug(path: &str) -> Result<&str> {
    let slug = path.trim_matches('/');
    if slug.is_empty() {
        return Err(Error::invalid_value("path", "wiki path is required"));
    }
    Ok(slug)
}
