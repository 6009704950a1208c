use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::http_client::http_client;

const CACHE_VERSION: u32 = 1;
const CACHE_DIR: &str = "ncaab_edges";
const CACHE_FILE: &str = "http_cache.json";
/// Oldest cached body still served when a feed is down. Lines move daily.
const MAX_STALE_SECS: u64 = 18 * 60 * 60;
/// Entries untouched for this long are dropped on save.
const RETENTION_SECS: u64 = 14 * 24 * 60 * 60;

static CACHE: Mutex<Option<HttpCacheFile>> = Mutex::new(None);

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct HttpCacheFile {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

/// GET `url` as text. With `use_cache`, sends conditional headers from the
/// last good response and falls back to that body when the feed is down.
pub fn fetch_text(url: &str, extra_headers: &[(&str, &str)], use_cache: bool) -> Result<String> {
    let client = http_client()?;
    if use_cache {
        fetch_text_cached(client, url, extra_headers)
    } else {
        fetch_text_uncached(client, url, extra_headers)
    }
}

fn fetch_text_uncached(client: &Client, url: &str, extra_headers: &[(&str, &str)]) -> Result<String> {
    let mut req = client.get(url);
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    let resp = req.send().with_context(|| format!("request failed: {url}"))?;
    let status = resp.status();
    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        return Err(anyhow::anyhow!("http {}: {}", status, snippet(&body)));
    }
    Ok(body)
}

pub fn fetch_text_cached(client: &Client, url: &str, extra_headers: &[(&str, &str)]) -> Result<String> {
    let cached_entry = {
        let mut guard = CACHE.lock().expect("http cache lock poisoned");
        let cache = guard.get_or_insert_with(load_cache_file);
        cache.entries.get(url).cloned()
    };

    let mut req = client.get(url);
    for (name, value) in extra_headers {
        req = req.header(*name, *value);
    }
    if let Some(entry) = cached_entry.as_ref() {
        if let Some(etag) = entry.etag.as_ref() {
            req = req.header(IF_NONE_MATCH, etag);
        }
        if let Some(last_modified) = entry.last_modified.as_ref() {
            req = req.header(IF_MODIFIED_SINCE, last_modified);
        }
    }

    let resp = match req.send() {
        Ok(resp) => resp,
        Err(err) => {
            return stale_or(
                cached_entry,
                url,
                anyhow::Error::new(err).context("request failed"),
                now_secs(),
            );
        }
    };
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        if let Some(entry) = cached_entry {
            debug!(url, "not modified, serving cached body");
            let body = entry.body.clone();
            refresh_cache_entry(
                url,
                CacheEntry {
                    fetched_at: now_secs(),
                    ..entry
                },
            );
            return Ok(body);
        }
        return Err(anyhow::anyhow!("received 304 without cache body"));
    }

    let body = resp.text().context("failed reading body")?;
    if !status.is_success() {
        let err = anyhow::anyhow!("http {}: {}", status, snippet(&body));
        return stale_or(cached_entry, url, err, now_secs());
    }

    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());

    let entry = CacheEntry {
        body: body.clone(),
        etag,
        last_modified,
        fetched_at: now_secs(),
    };
    refresh_cache_entry(url, entry);
    Ok(body)
}

fn stale_or(cached: Option<CacheEntry>, url: &str, err: anyhow::Error, now: u64) -> Result<String> {
    match cached {
        Some(entry) if now.saturating_sub(entry.fetched_at) <= MAX_STALE_SECS => {
            warn!(url, fetched_at = entry.fetched_at, error = %err, "feed unavailable, using cached body");
            Ok(entry.body)
        }
        Some(entry) => Err(err.context(format!(
            "cached body from {} is older than {}h",
            entry.fetched_at,
            MAX_STALE_SECS / 3600
        ))),
        None => Err(err),
    }
}

fn prune_expired(cache: &mut HttpCacheFile, now: u64) -> usize {
    let before = cache.entries.len();
    cache
        .entries
        .retain(|_, entry| now.saturating_sub(entry.fetched_at) <= RETENTION_SECS);
    before - cache.entries.len()
}

fn snippet(body: &str) -> String {
    body.trim()
        .replace(['\n', '\r'], " ")
        .chars()
        .take(220)
        .collect()
}

fn refresh_cache_entry(key: &str, entry: CacheEntry) {
    let mut guard = CACHE.lock().expect("http cache lock poisoned");
    let cache = guard.get_or_insert_with(load_cache_file);
    cache.version = CACHE_VERSION;
    cache.entries.insert(key.to_string(), entry);
    let pruned = prune_expired(cache, now_secs());
    if pruned > 0 {
        debug!(pruned, "expired http cache entries dropped");
    }
    if let Err(err) = save_cache_file(cache) {
        debug!(error = %err, "http cache not saved");
    }
}

fn load_cache_file() -> HttpCacheFile {
    let Some(path) = cache_path() else {
        return HttpCacheFile::default();
    };
    let raw = fs::read_to_string(path).ok();
    let Some(raw) = raw else {
        return HttpCacheFile::default();
    };
    let cache = serde_json::from_str::<HttpCacheFile>(&raw).unwrap_or_default();
    if cache.version != CACHE_VERSION {
        return HttpCacheFile::default();
    }
    cache
}

fn save_cache_file(cache: &HttpCacheFile) -> Result<()> {
    let Some(path) = cache_path() else {
        return Ok(());
    };
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    fs::create_dir_all(dir).ok();
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(cache).context("serialize http cache")?;
    fs::write(&tmp, json).context("write http cache")?;
    fs::rename(&tmp, &path).context("swap http cache")?;
    Ok(())
}

pub fn app_cache_dir() -> Option<PathBuf> {
    if let Ok(base) = std::env::var("XDG_CACHE_HOME") {
        if !base.trim().is_empty() {
            return Some(PathBuf::from(base).join(CACHE_DIR));
        }
    }
    let home = std::env::var("HOME").ok()?;
    if home.trim().is_empty() {
        return None;
    }
    Some(PathBuf::from(home).join(".cache").join(CACHE_DIR))
}

fn cache_path() -> Option<PathBuf> {
    app_cache_dir().map(|dir| dir.join(CACHE_FILE))
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}

fn now_secs() -> u64 {
    system_time_to_secs(SystemTime::now()).unwrap_or_default()
}
