use kfc_core::{Error, Result};
use kfc_storage::{keys, LocalStorage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::watch;

use crate::container::{Container, Persist};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SidebarType {
    #[default]
    Original,
    Bookshelf,
    Favorites,
    Trending,
    Settings,
}

impl SidebarType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SidebarType::Original => "original",
            SidebarType::Bookshelf => "bookshelf",
            SidebarType::Favorites => "favorites",
            SidebarType::Trending => "trending",
            SidebarType::Settings => "settings",
        }
    }
}

impl fmt::Display for SidebarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SidebarType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "original" => Ok(SidebarType::Original),
            "bookshelf" => Ok(SidebarType::Bookshelf),
            "favorites" => Ok(SidebarType::Favorites),
            "trending" => Ok(SidebarType::Trending),
            "settings" => Ok(SidebarType::Settings),
            other => Err(Error::Validation(format!("Unknown sidebar: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SidebarState {
    pub is_expanded: bool,
    pub active_sidebar: SidebarType,
}

impl Persist for SidebarState {
    type Persisted = SidebarState;

    fn persisted(&self) -> SidebarState {
        self.clone()
    }

    fn restore(&mut self, persisted: SidebarState) {
        *self = persisted;
    }
}

#[derive(Debug)]
pub struct SidebarStore {
    state: Container<SidebarState>,
}

impl SidebarStore {
    pub fn new(storage: Arc<dyn LocalStorage>) -> Self {
        Self {
            state: Container::new(keys::SIDEBAR_STORE, storage, SidebarState::default()),
        }
    }

    pub fn hydrate(&self) -> Result<bool> {
        self.state.hydrate()
    }

    pub fn snapshot(&self) -> SidebarState {
        self.state.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<SidebarState> {
        self.state.subscribe()
    }

    pub fn set_expanded(&self, expanded: bool) {
        self.state.update(|s| s.is_expanded = expanded);
    }

    pub fn toggle_expand(&self) {
        self.state.update(|s| s.is_expanded = !s.is_expanded);
    }

    pub fn set_active_sidebar(&self, sidebar: SidebarType) {
        self.state.update(|s| s.active_sidebar = sidebar);
    }
}
