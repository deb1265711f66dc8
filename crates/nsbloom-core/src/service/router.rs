//! Request routing: one request in, one [`Reply`] out
//!
//! | Request                              | Reply                          |
//! |--------------------------------------|--------------------------------|
//! | `POST key=k [ns=n]`                  | `{"ok":<id>}` / `{"error":"exists"}` |
//! | non-POST `key=k [ns=n]`              | `1` / `0`                      |
//! | non-POST `metrics=<non-empty>`       | metrics snapshot               |
//! | anything else                        | 400, empty body                |
//!
//! The router is synchronous; lazy namespace creation touches the
//! filesystem, so async callers run it on a blocking thread.

use std::borrow::Cow;
use std::sync::Arc;

use axum::http::Method;
use nsbloom_filters::MembershipFilter;
use percent_encoding::percent_decode;
use tracing::{debug, warn};

use super::handle::Insertion;
use super::registry::NamespaceRegistry;
use crate::domain::{InsertionIds, LimitsConfig, Metrics, MetricsSnapshot, Namespace};

/// The three recognized request parameters as raw bytes; absent means empty
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestParams {
    pub key: Option<Vec<u8>>,
    pub ns: Option<Vec<u8>>,
    pub metrics: Option<Vec<u8>>,
}

impl RequestParams {
    /// Decode an `application/x-www-form-urlencoded` string (a query string
    /// or a form body).
    ///
    /// Values are percent-decoded to bytes without any UTF-8 interpretation.
    /// The first occurrence of a parameter wins; unknown names are ignored.
    pub fn from_urlencoded(input: &[u8]) -> Self {
        let mut params = Self::default();
        for pair in input.split(|b| *b == b'&').filter(|pair| !pair.is_empty()) {
            let (name, value) = match pair.iter().position(|b| *b == b'=') {
                Some(eq) => (&pair[..eq], &pair[eq + 1..]),
                None => (pair, &[][..]),
            };
            let slot = match decode(name).as_ref() {
                b"key" => &mut params.key,
                b"ns" => &mut params.ns,
                b"metrics" => &mut params.metrics,
                _ => continue,
            };
            if slot.is_none() {
                *slot = Some(decode(value).into_owned());
            }
        }
        params
    }

    /// Fill values missing here from `fallback` (query string wins over body)
    pub fn or(self, fallback: RequestParams) -> Self {
        Self {
            key: self.key.or(fallback.key),
            ns: self.ns.or(fallback.ns),
            metrics: self.metrics.or(fallback.metrics),
        }
    }

    pub fn key(&self) -> &[u8] {
        self.key.as_deref().unwrap_or_default()
    }

    pub fn namespace(&self) -> &[u8] {
        self.ns.as_deref().unwrap_or_default()
    }

    pub fn metrics(&self) -> &[u8] {
        self.metrics.as_deref().unwrap_or_default()
    }
}

/// `+` is a space, then `%XX` escapes become raw bytes
fn decode(raw: &[u8]) -> Cow<'_, [u8]> {
    if raw.contains(&b'+') {
        let spaced: Vec<u8> = raw.iter().map(|&b| if b == b'+' { b' ' } else { b }).collect();
        Cow::Owned(Cow::from(percent_decode(&spaced)).into_owned())
    } else {
        percent_decode(raw).into()
    }
}

/// Transport-independent outcome of a request
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Key added under this insertion id
    Added(u64),
    /// Key already present, nothing changed
    Exists,
    /// Membership answer
    Member(bool),
    Metrics(MetricsSnapshot),
    /// Request matched no operation
    Unhandled,
    KeyTooLong,
    InvalidNamespace,
    /// Filesystem failure while creating a namespace; details are logged only
    Internal,
}

/// Routes requests to the namespace registry
#[derive(Debug)]
pub struct RequestRouter<F> {
    registry: Arc<NamespaceRegistry<F>>,
    metrics: Arc<Metrics>,
    ids: Arc<InsertionIds>,
    limits: LimitsConfig,
}

impl<F: MembershipFilter> RequestRouter<F> {
    pub fn new(
        registry: Arc<NamespaceRegistry<F>>,
        metrics: Arc<Metrics>,
        ids: Arc<InsertionIds>,
        limits: LimitsConfig,
    ) -> Self {
        Self {
            registry,
            metrics,
            ids,
            limits,
        }
    }

    /// Handle one request
    pub fn handle(&self, method: &Method, params: &RequestParams) -> Reply {
        let key = params.key();
        if key.len() > self.limits.max_key_bytes {
            debug!(len = key.len(), max = self.limits.max_key_bytes, "Rejected oversized key");
            return Reply::KeyTooLong;
        }

        let Ok(raw_namespace) = std::str::from_utf8(params.namespace()) else {
            debug!("Rejected non UTF-8 namespace");
            return Reply::InvalidNamespace;
        };
        let namespace = match Namespace::parse(raw_namespace, self.limits.max_namespace_bytes) {
            Ok(ns) => ns,
            Err(e) => {
                debug!(error = %e, "Rejected invalid namespace");
                return Reply::InvalidNamespace;
            }
        };

        // Resolution happens before the method is inspected, so any request
        // naming a new namespace creates it.
        let handle = match self.registry.resolve(&namespace) {
            Ok(handle) => handle,
            Err(e) => {
                warn!(namespace = %namespace, error = %e, "Namespace unavailable");
                return Reply::Internal;
            }
        };

        if *method == Method::POST {
            return match handle.insert_if_absent(key, &self.ids) {
                Insertion::Added(id) => {
                    self.metrics.record_addition();
                    Reply::Added(id)
                }
                Insertion::Exists => Reply::Exists,
            };
        }

        if !key.is_empty() {
            let hit = handle.check(key);
            self.metrics.record_query(hit);
            return Reply::Member(hit);
        }

        if !params.metrics().is_empty() {
            return Reply::Metrics(self.metrics.snapshot());
        }

        Reply::Unhandled
    }

    pub fn registry(&self) -> &Arc<NamespaceRegistry<F>> {
        &self.registry
    }
}
