//! In-memory wiki used by the integration tests.
#![allow(dead_code)]

use rustc_hash::FxHashMap;
use serde_json::{json, Value};
use std::cell::RefCell;
use wikistat::api::WikiApi;
use wikistat::error::ApiError;

#[derive(Default)]
pub struct FakeWiki {
    /// Category -> batches of member titles, one batch per continuation step
    categories: FxHashMap<String, Vec<Vec<String>>>,
    pages: FxHashMap<String, String>,
    /// Category -> batch index whose request fails
    failing_batches: FxHashMap<String, usize>,
    failing_pages: Vec<String>,
    fetches: RefCell<Vec<String>>,
}

impl FakeWiki {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, name: &str, batches: &[&[&str]]) -> Self {
        let batches = batches
            .iter()
            .map(|batch| batch.iter().map(|t| t.to_string()).collect())
            .collect();
        self.categories.insert(name.to_string(), batches);
        self
    }

    pub fn page(mut self, title: &str, wikitext: &str) -> Self {
        self.pages.insert(title.to_string(), wikitext.to_string());
        self
    }

    pub fn fail_batch(mut self, category: &str, batch: usize) -> Self {
        self.failing_batches.insert(category.to_string(), batch);
        self
    }

    pub fn fail_page(mut self, title: &str) -> Self {
        self.failing_pages.push(title.to_string());
        self
    }

    /// Titles whose markup was requested, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetches.borrow().clone()
    }

    fn members(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let category = param(params, "cmtitle").unwrap_or_default();
        let batches = self.categories.get(category).cloned().unwrap_or_default();
        let index: usize = param(params, "cmcontinue")
            .and_then(|t| t.parse().ok())
            .unwrap_or(0);

        if self.failing_batches.get(category) == Some(&index) {
            return Err(ApiError::Transport(format!("{} batch {} unavailable", category, index)));
        }

        let members: Vec<Value> = batches
            .get(index)
            .map(|batch| batch.iter().map(|t| json!({"title": t, "ns": 0})).collect())
            .unwrap_or_default();
        let mut body = json!({"query": {"categorymembers": members}});
        if index + 1 < batches.len() {
            body["continue"] = json!({"cmcontinue": (index + 1).to_string(), "continue": "-||"});
        }
        Ok(body)
    }

    fn parse(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let title = param(params, "page").unwrap_or_default();
        self.fetches.borrow_mut().push(title.to_string());
        if self.failing_pages.iter().any(|t| t == title) {
            return Err(ApiError::Transport("HTTP 503 Service Unavailable".into()));
        }
        match self.pages.get(title) {
            Some(text) => Ok(json!({"parse": {"title": title, "pageid": 1, "wikitext": text}})),
            None => Ok(json!({"error": {"code": "missingtitle", "info": "The page you specified doesn't exist."}})),
        }
    }

    fn image(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        let file = param(params, "titles").unwrap_or_default();
        let name = file.trim_start_matches("File:").replace(' ', "_");
        Ok(json!({"query": {"pages": [{
            "title": file,
            "imageinfo": [{"url": format!("https://oldschool.runescape.wiki/images/{}", name)}]
        }]}}))
    }
}

impl WikiApi for FakeWiki {
    fn get(&self, params: &[(&str, String)]) -> Result<Value, ApiError> {
        match (param(params, "list"), param(params, "action"), param(params, "prop")) {
            (Some("categorymembers"), _, _) => self.members(params),
            (_, Some("parse"), _) => self.parse(params),
            (_, _, Some("imageinfo")) => self.image(params),
            _ => Err(ApiError::Malformed(format!("unexpected request {:?}", params))),
        }
    }
}

pub fn param<'p>(params: &'p [(&str, String)], key: &str) -> Option<&'p str> {
    params.iter().find(|(k, _)| *k == key).map(|(_, v)| v.as_str())
}

/// Equipment page markup with an id, an image and a stab bonus.
pub fn item_page(id: u64, image: &str, stab: i64) -> String {
    format!(
        "{{{{Infobox Item\n|name = Item\n|image = [[File:{}]]\n|id = {}\n}}}}\n\
         {{{{Infobox Bonuses\n|astab = +{}\n|slot = weapon\n|speed = 4\n}}}}\n\
         [[Category:Weapons]]",
        image, id, stab
    )
}
