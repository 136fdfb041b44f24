use kfc_core::{Article, Author, RagSource, RagSourceMetadata, Reference, TrendingPeriod};
use rand::Rng;
use serde_json::{Map, Value};

const EXCERPT_CHARS: usize = 150;
const MAX_SOURCES: usize = 2;

/// Canned data served while mock mode is on.
#[derive(Debug, Clone)]
pub struct MockFixtures {
    pub articles: Vec<Article>,
    pub trending: TrendingRankings,
    /// Keyword → answer, checked in order against the lowercased query.
    pub preset_answers: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default)]
pub struct TrendingRankings {
    pub day: Vec<Article>,
    pub week: Vec<Article>,
    pub month: Vec<Article>,
}

impl TrendingRankings {
    pub fn rank(articles: &[Article]) -> Self {
        let mut day = articles.to_vec();
        day.sort_by(|a, b| {
            b.popularity_score
                .unwrap_or(0.0)
                .total_cmp(&a.popularity_score.unwrap_or(0.0))
        });
        day.truncate(3);

        let mut week = articles.to_vec();
        week.sort_by(|a, b| b.views.unwrap_or(0).cmp(&a.views.unwrap_or(0)));
        week.truncate(4);

        let mut month = articles.to_vec();
        month.sort_by(|a, b| b.citations.unwrap_or(0).cmp(&a.citations.unwrap_or(0)));

        Self { day, week, month }
    }

    pub fn for_period(&self, period: TrendingPeriod) -> &[Article] {
        match period {
            TrendingPeriod::Day => &self.day,
            TrendingPeriod::Week => &self.week,
            TrendingPeriod::Month => &self.month,
        }
    }
}

impl Default for MockFixtures {
    fn default() -> Self {
        Self::with_articles(default_articles())
    }
}

impl MockFixtures {
    pub fn with_articles(articles: Vec<Article>) -> Self {
        let trending = TrendingRankings::rank(&articles);
        Self {
            articles,
            trending,
            preset_answers: default_preset_answers(),
        }
    }

    pub fn replace_articles(&mut self, articles: Vec<Article>) {
        self.trending = TrendingRankings::rank(&articles);
        self.articles = articles;
    }

    /// Preset answers from a JSON object of keyword → answer.
    pub fn replace_preset_answers(&mut self, answers: &Map<String, Value>) {
        self.preset_answers = answers
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|answer| (k.clone(), answer.to_string())))
            .collect();
    }

    pub fn preset_answers_json(&self) -> Value {
        Value::Object(
            self.preset_answers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }

    pub fn find_article(&self, id: &str) -> Option<&Article> {
        self.articles.iter().find(|a| a.id == id)
    }

    /// Matching articles with a made-up relevance in [0.5, 1.0).
    pub fn search(&self, query: &str) -> Vec<(Article, f64)> {
        let mut rng = rand::thread_rng();
        self.articles
            .iter()
            .filter(|a| a.matches(query))
            .map(|a| (a.clone(), rng.gen_range(0.5..1.0)))
            .collect()
    }

    pub fn preset_answer(&self, query: &str) -> Option<&str> {
        let query = query.to_lowercase();
        self.preset_answers
            .iter()
            .find(|(keyword, _)| query.contains(&keyword.to_lowercase()))
            .map(|(_, answer)| answer.as_str())
    }

    /// Answer used by the mock `/rag/query` endpoint.
    pub fn generate_answer(&self, query: &str) -> String {
        if let Some(answer) = self.preset_answer(query) {
            return answer.to_string();
        }
        let q = query.to_lowercase();
        if q.contains("什么") || q.contains("介绍") || q.contains("what") {
            "根据相关文章，这是一种先进的技术方法，主要应用于数据分析和模式识别。它通过复杂的算法和模型架构，能够从大规模数据中提取有价值的信息和规律，为实际问题提供解决方案。".to_string()
        } else if q.contains("如何") || q.contains("怎么") || q.contains("how") {
            HOW_ANSWER.to_string()
        } else if q.contains("比较") || q.contains("区别") || q.contains("compare") {
            "这些方法各有优缺点。传统方法计算成本低但精度有限；先进方法精度高但需要大量数据和计算资源；混合方法则试图结合两者优点。选择哪种方法应根据具体应用场景、可用资源和性能要求来决定。".to_string()
        } else {
            "根据您的问题，我可以提供以下见解：这个领域目前正在快速发展，研究人员提出了多种创新方法来解决相关挑战。虽然取得了显著进展，但仍存在一些待解决的问题，如计算效率、泛化能力和实际部署等。".to_string()
        }
    }

    /// Answer grounded on the titles of the given shelf articles.
    pub fn generate_answer_for(&self, query: &str, articles: &[Article]) -> String {
        if let Some(answer) = self.preset_answer(query) {
            return answer.to_string();
        }
        let titles = articles.iter().map(|a| a.title.as_str()).collect::<Vec<_>>().join("、");
        let q = query.to_lowercase();
        if q.contains("什么") || q.contains("介绍") || q.contains("what") {
            format!("根据您书架中的文章（{}），我可以提供相关概念的介绍。这些文章主要讨论了人工智能领域的最新进展，包括深度学习、神经网络和机器学习应用等方面。", titles)
        } else if q.contains("如何") || q.contains("怎么") || q.contains("how") {
            format!("基于您收藏的文章内容，{}", HOW_ANSWER)
        } else if q.contains("未来") || q.contains("趋势") || q.contains("trend") {
            "根据您收藏的研究文章，未来发展趋势可能包括：更高效的模型架构、更少的标注数据需求、更强的跨领域迁移能力，以及更好的可解释性。".to_string()
        } else {
            format!("基于您书架中的文章（{}），我可以回答您的问题。这些文章主要讨论了人工智能和机器学习领域的最新研究成果和应用案例。", titles)
        }
    }

    /// Up to two matching articles as citations, relevance 0.9, 0.7.
    pub fn source_extraction(query: &str, articles: &[Article]) -> Vec<RagSource> {
        articles
            .iter()
            .filter(|a| a.matches(query))
            .take(MAX_SOURCES)
            .enumerate()
            .map(|(i, a)| RagSource {
                id: a.id.clone(),
                title: a.title.clone(),
                content: excerpt(&a.content),
                relevance: 0.9 - (i as f64) * 0.2,
                metadata: Some(RagSourceMetadata {
                    article_id: Some(a.id.clone()),
                    tags: a.tags.clone(),
                }),
            })
            .collect()
    }
}

const HOW_ANSWER: &str = "实现这一目标的方法包括：首先，需要明确问题定义和目标；其次，收集和预处理相关数据；然后，选择合适的模型架构并进行训练；最后，评估模型性能并进行必要的优化。";

fn excerpt(content: &str) -> String {
    let head: String = content.chars().take(EXCERPT_CHARS).collect();
    format!("{}...", head)
}

fn default_preset_answers() -> Vec<(String, String)> {
    vec![
        (
            "深度学习".to_string(),
            "深度学习是机器学习的一个分支，它使用多层神经网络来模拟人脑的学习过程，能够从大量数据中自动提取特征和模式。近年来，深度学习在计算机视觉、自然语言处理等领域取得了突破性进展。".to_string(),
        ),
        (
            "量子计算".to_string(),
            "量子计算是利用量子力学原理进行信息处理的计算方式，它使用量子比特(qubit)代替经典比特，通过叠加和纠缠等量子现象实现超越经典计算的能力。".to_string(),
        ),
        (
            "机器学习".to_string(),
            "机器学习是人工智能的核心技术之一，它使计算机系统能够从数据中学习规律和模式，而不是显式编程。常见的机器学习方法包括监督学习、无监督学习和强化学习等。".to_string(),
        ),
    ]
}

fn author(id: &str, name: &str, bio: &str) -> Author {
    Author {
        id: id.to_string(),
        name: name.to_string(),
        bio: Some(bio.to_string()),
    }
}

fn tags(values: &[&str]) -> Option<Vec<String>> {
    Some(values.iter().map(|t| t.to_string()).collect())
}

#[allow(clippy::too_many_arguments)]
fn fixture(
    id: &str,
    title: &str,
    content: &str,
    summary: &str,
    authors: Vec<Author>,
    tag_list: &[&str],
    published_at: &str,
    image: &str,
    views: u64,
    citations: u64,
    popularity: f64,
) -> Article {
    Article {
        id: id.to_string(),
        title: title.to_string(),
        image_url: format!("https://via.placeholder.com/800x400?text={}", image),
        content: content.to_string(),
        summary: Some(summary.to_string()),
        published_at: Some(published_at.to_string()),
        reading_time: Some((content.chars().count() / 300).max(1) as u32),
        views: Some(views),
        popularity_score: Some(popularity),
        citations: Some(citations),
        tags: tags(tag_list),
        authors: Some(authors),
        references: None,
        created_at: None,
        updated_at: None,
    }
}

pub fn default_articles() -> Vec<Article> {
    let mut articles = vec![
        fixture(
            "1",
            "深度学习在自然语言处理中的最新进展",
            "近年来，深度学习技术在自然语言处理(NLP)领域取得了显著进展。本文介绍了Transformer架构及其变体（如BERT、GPT系列）如何革新了NLP任务处理方式。这些模型能够捕捉语言中的长距离依赖关系，已在机器翻译、文本摘要、问答系统等多种场景中展现出优异性能。未来研究方向包括降低模型计算成本、提高多语言能力、增强跨模态理解等方面。",
            "本文概述了Transformer架构及其在NLP领域的突破性应用，并讨论了大型语言模型的发展方向。",
            vec![author("101", "张明", "清华大学"), author("102", "李华", "北京人工智能研究院")],
            &["深度学习", "自然语言处理", "Transformer", "大型语言模型"],
            "2023-10-15T08:00:00Z",
            "NLP+Advances",
            2453,
            28,
            9.6,
        ),
        fixture(
            "2",
            "量子计算的实际应用与挑战",
            "量子计算正从理论研究走向实际应用。本文深入探讨了量子计算机的工作原理，量子比特的实现方式，以及量子计算面临的去相干性等挑战。当前，量子计算已在密码学、材料科学和药物发现等领域展现出潜力。尽管取得了进展，量子计算仍面临硬件稳定性、错误校正、算法设计等多重挑战。",
            "本文探讨了量子计算的基本原理、当前应用场景及其面临的技术挑战。",
            vec![author("103", "王强", "中国科学院物理研究所")],
            &["量子计算", "量子算法", "量子纠错", "量子优势"],
            "2023-09-22T10:30:00Z",
            "Quantum+Computing",
            1897,
            15,
            8.7,
        ),
        fixture(
            "3",
            "机器学习在医学影像诊断中的应用",
            "机器学习技术，尤其是深度学习，正在彻底改变医学影像诊断领域。本文综述了卷积神经网络(CNN)在X光片、CT、MRI等医学影像分析中的应用。研究表明，AI辅助诊断系统在某些疾病检测任务上已达到或超过专业医生水平。然而，医学AI系统的广泛应用仍面临数据隐私、模型解释性、临床整合等挑战。",
            "本文探讨了深度学习在医学影像领域的应用现状、成功案例及其面临的伦理和实践挑战。",
            vec![author("104", "刘芳", "上海交通大学医学院"), author("105", "陈明", "复旦大学附属华山医院")],
            &["机器学习", "医学影像", "卷积神经网络", "辅助诊断"],
            "2023-11-05T14:20:00Z",
            "Medical+Imaging+AI",
            3214,
            42,
            9.2,
        ),
        fixture(
            "4",
            "图神经网络在推荐系统中的应用",
            "图神经网络(GNN)为处理推荐系统中的复杂用户-物品交互关系提供了强大框架。本文详细介绍了GNN如何捕捉用户行为模式并生成个性化推荐。GNN通过消息传递机制，能够利用整个图的连接模式来学习节点表示。实验结果表明，基于GNN的推荐模型在准确性、多样性和冷启动等多个方面都优于传统方法。",
            "本文分析了图神经网络如何革新推荐系统，提高个性化推荐质量和用户满意度。",
            vec![author("106", "赵莉", "腾讯AI Lab")],
            &["图神经网络", "推荐系统", "协同过滤", "深度学习"],
            "2023-08-18T09:45:00Z",
            "GNN+Recommender",
            2780,
            31,
            8.9,
        ),
        fixture(
            "5",
            "强化学习在自动驾驶决策系统中的应用",
            "强化学习(RL)为自动驾驶车辆提供了处理复杂交通场景的有效决策框架。本文探讨了RL算法如何使自动驾驶系统学习安全且高效的驾驶策略。研究人员利用深度Q网络(DQN)、近端策略优化(PPO)等算法，训练自动驾驶智能体应对变道、避障、交叉路口通行等复杂场景。",
            "本文讨论了强化学习在自动驾驶决策系统中的创新应用和关键技术挑战。",
            vec![author("107", "杨伟", "百度自动驾驶实验室"), author("108", "黄建", "清华大学车辆与运载学院")],
            &["强化学习", "自动驾驶", "决策系统", "智能交通"],
            "2023-10-30T11:15:00Z",
            "RL+for+Autonomous+Driving",
            1956,
            24,
            8.5,
        ),
    ];

    articles[3].references = Some(vec![Reference {
        id: "1".to_string(),
        title: "深度学习在自然语言处理中的最新进展".to_string(),
        url: "/articles/1".to_string(),
    }]);
    articles[2].references = Some(vec![Reference {
        id: "1".to_string(),
        title: "深度学习在自然语言处理中的最新进展".to_string(),
        url: "/articles/1".to_string(),
    }]);

    articles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trending_rankings() {
        let fixtures = MockFixtures::default();
        let day: Vec<&str> = fixtures.trending.day.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(day, vec!["1", "3", "4"]);
        let week: Vec<&str> = fixtures.trending.week.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(week, vec!["3", "4", "1", "5"]);
        assert_eq!(fixtures.trending.month.len(), 5);
        assert_eq!(fixtures.trending.month[0].id, "3");
    }

    #[test]
    fn test_search_matches_tags_case_insensitively() {
        let fixtures = MockFixtures::default();
        let results = fixtures.search("transformer");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0.id, "1");
        assert!((0.5..1.0).contains(&results[0].1));
    }

    #[test]
    fn test_preset_answers_take_priority() {
        let fixtures = MockFixtures::default();
        assert!(fixtures.generate_answer("什么是量子计算？").starts_with("量子计算是"));
        assert!(fixtures.generate_answer("如何开始").starts_with("实现这一目标"));
    }

    #[test]
    fn test_source_extraction() {
        let fixtures = MockFixtures::default();
        let sources = MockFixtures::source_extraction("深度学习", &fixtures.articles);
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].relevance, 0.9);
        assert!((sources[1].relevance - 0.7).abs() < 1e-9);
        assert!(sources[0].content.ends_with("..."));
        assert!(MockFixtures::source_extraction("nothing-matches", &fixtures.articles).is_empty());
    }
}
