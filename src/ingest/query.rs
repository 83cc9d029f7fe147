// src/ingest/query.rs
//! Outbound search filters.
//!
//! The upstream API treats an explicit empty value differently from an absent
//! key, so blanks are dropped before serialization instead of being sent as
//! `""`, `[]` or `null`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilters {
    /// Substring match on the notice title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Category ids (CPV codes).
    #[serde(default, alias = "cpv_items", skip_serializing_if = "Vec::is_empty")]
    pub cpv_items: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub organizations: Vec<String>,
    #[serde(default, alias = "contract_type", skip_serializing_if = "Option::is_none")]
    pub contract_type: Option<String>,
    /// Publication window.
    #[serde(default, alias = "date_from", skip_serializing_if = "Option::is_none")]
    pub date_from: Option<NaiveDate>,
    #[serde(default, alias = "date_to", skip_serializing_if = "Option::is_none")]
    pub date_to: Option<NaiveDate>,
    #[serde(
        default,
        rename = "totalCostFrom",
        alias = "budget_from",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_from: Option<f64>,
    #[serde(
        default,
        rename = "totalCostTo",
        alias = "budget_to",
        skip_serializing_if = "Option::is_none"
    )]
    pub budget_to: Option<f64>,
    #[serde(
        default,
        rename = "finalDateFrom",
        alias = "deadline_from",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline_from: Option<NaiveDate>,
    #[serde(
        default,
        rename = "finalDateTo",
        alias = "deadline_to",
        skip_serializing_if = "Option::is_none"
    )]
    pub deadline_to: Option<NaiveDate>,
    #[serde(default, alias = "is_modified", skip_serializing_if = "Option::is_none")]
    pub is_modified: Option<bool>,
}

fn clean_opt(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
}

fn clean_list(items: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(items.len());
    for it in items {
        let t = it.trim();
        if !t.is_empty() && !out.iter().any(|o| o == t) {
            out.push(t.to_string());
        }
    }
    out
}

impl QueryFilters {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Trimmed copy with blank strings and blank list entries removed.
    pub fn normalized(&self) -> Self {
        Self {
            title: clean_opt(&self.title),
            cpv_items: clean_list(&self.cpv_items),
            organizations: clean_list(&self.organizations),
            contract_type: clean_opt(&self.contract_type),
            date_from: self.date_from,
            date_to: self.date_to,
            budget_from: self.budget_from.filter(|v| v.is_finite()),
            budget_to: self.budget_to.filter(|v| v.is_finite()),
            deadline_from: self.deadline_from,
            deadline_to: self.deadline_to,
            is_modified: self.is_modified,
        }
    }

    /// JSON body for `POST /notice`. Absent options have no key at all.
    pub fn to_request_body(&self) -> serde_json::Value {
        serde_json::to_value(self.normalized())
            .unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    pub fn is_empty(&self) -> bool {
        self.normalized() == Self::default()
    }
}
