//! REST paths, relative to the configured base URL.

pub mod auth {
    pub const REGISTER: &str = "/auth/register";
    pub const LOGIN: &str = "/auth/login";
}

pub mod articles {
    pub const LIST: &str = "/articles";
    pub const SEARCH: &str = "/articles/search";
    pub const TRENDING: &str = "/articles/trending";
    pub const CREATE: &str = "/articles";

    pub fn detail(id: &str) -> String {
        format!("/articles/{}", id)
    }
}

pub mod shelf {
    pub const LIST: &str = "/shelf";
    pub const ADD: &str = "/shelf";

    pub fn remove(id: &str) -> String {
        format!("/shelf/{}", id)
    }
}

pub mod favorites {
    pub const LIST: &str = "/favorites";

    pub fn item(id: &str) -> String {
        format!("/favorites/{}", id)
    }

    pub fn status(id: &str) -> String {
        format!("/favorites/{}/status", id)
    }
}

pub mod rag {
    pub const DATASETS: &str = "/rag/datasets";
    pub const QUERY: &str = "/rag/query";

    pub fn dataset(id: &str) -> String {
        format!("/rag/datasets/{}", id)
    }

    pub fn dataset_article(dataset_id: &str, article_id: &str) -> String {
        format!("/rag/datasets/{}/articles/{}", dataset_id, article_id)
    }
}

pub mod settings {
    pub const GET: &str = "/settings";
    pub const UPDATE: &str = "/settings";
}
