//! Knowledge graph derived from the favourite articles.

use kfc_core::{Article, GraphData, GraphLink, GraphNode};
use std::collections::HashSet;

pub const ARTICLE_NODE_SIZE: u32 = 20;
pub const AUTHOR_NODE_SIZE: u32 = 10;

/// One node per article and per distinct author, `authored` links from
/// authors to articles and `references` links between favourites.
pub fn build_graph(articles: &[Article]) -> GraphData {
    let mut graph = GraphData::default();
    let mut seen_authors = HashSet::new();
    let ids: HashSet<&str> = articles.iter().map(|a| a.id.as_str()).collect();

    for article in articles {
        graph.nodes.push(GraphNode {
            id: article.id.clone(),
            name: article.title.clone(),
            val: ARTICLE_NODE_SIZE,
            group: Some("article".to_string()),
            article_id: Some(article.id.clone()),
        });

        for author in article.authors.iter().flatten() {
            let author_id = format!("author-{}", author.id);
            if seen_authors.insert(author_id.clone()) {
                graph.nodes.push(GraphNode {
                    id: author_id.clone(),
                    name: author.name.clone(),
                    val: AUTHOR_NODE_SIZE,
                    group: Some("author".to_string()),
                    article_id: None,
                });
            }
            graph.links.push(link(author_id, article.id.clone(), "authored"));
        }

        for reference in article.references.iter().flatten() {
            if ids.contains(reference.id.as_str()) {
                graph
                    .links
                    .push(link(article.id.clone(), reference.id.clone(), "references"));
            }
        }
    }

    graph
}

fn link(source: String, target: String, kind: &str) -> GraphLink {
    GraphLink {
        source,
        target,
        value: 1,
        link_type: Some(kind.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kfc_core::{Author, Reference};

    fn article(id: &str, authors: &[(&str, &str)], refs: &[&str]) -> Article {
        Article {
            id: id.to_string(),
            title: format!("Article {}", id),
            authors: Some(
                authors
                    .iter()
                    .map(|(id, name)| Author {
                        id: id.to_string(),
                        name: name.to_string(),
                        bio: None,
                    })
                    .collect(),
            ),
            references: Some(
                refs.iter()
                    .map(|r| Reference {
                        id: r.to_string(),
                        title: String::new(),
                        url: String::new(),
                    })
                    .collect(),
            ),
            ..Default::default()
        }
    }

    #[test]
    fn test_graph_shares_authors_and_links_references() {
        let articles = vec![
            article("1", &[("a", "Ann"), ("b", "Bo")], &[]),
            article("2", &[("a", "Ann")], &["1", "99"]),
        ];
        let graph = build_graph(&articles);

        let ids: Vec<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "author-a", "author-b", "2"]);
        assert_eq!(graph.nodes[0].val, ARTICLE_NODE_SIZE);
        assert_eq!(graph.nodes[1].val, AUTHOR_NODE_SIZE);

        let authored = graph
            .links
            .iter()
            .filter(|l| l.link_type.as_deref() == Some("authored"))
            .count();
        assert_eq!(authored, 3);

        let references: Vec<_> = graph
            .links
            .iter()
            .filter(|l| l.link_type.as_deref() == Some("references"))
            .collect();
        assert_eq!(references.len(), 1);
        assert_eq!((references[0].source.as_str(), references[0].target.as_str()), ("2", "1"));
    }

    #[test]
    fn test_empty_favourites_give_empty_graph() {
        assert_eq!(build_graph(&[]), GraphData::default());
    }
}
