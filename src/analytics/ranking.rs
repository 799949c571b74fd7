//! 热度排序
//!
//! 纯函数，不碰数据库：候选集和使用量由调用方提供。
//! 排序键依次为：徽章档（热门或推荐，单一档位）、
//! 窗口内使用量、创建时间（新的在前）。

use std::collections::HashMap;

use migration::entities::promo_code;

/// 热度排序
///
/// `usage` 为 promo_id -> 窗口内点击类事件计数，缺失按 0。
pub fn rank_promos(
    mut promos: Vec<promo_code::Model>,
    usage: &HashMap<i64, i64>,
) -> Vec<promo_code::Model> {
    promos.sort_by(|a, b| {
        let a_badge = a.is_hot || a.is_recommended;
        let b_badge = b.is_hot || b.is_recommended;
        let a_usage = usage.get(&a.id).copied().unwrap_or(0);
        let b_usage = usage.get(&b.id).copied().unwrap_or(0);

        b_badge
            .cmp(&a_badge)
            .then_with(|| b_usage.cmp(&a_usage))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    promos
}

/// 默认排序：推荐在前、热门次之、新的在前
///
/// 未知 ordering 参数和聚合读取失败时的兜底。
pub fn default_order(mut promos: Vec<promo_code::Model>) -> Vec<promo_code::Model> {
    promos.sort_by(|a, b| {
        b.is_recommended
            .cmp(&a.is_recommended)
            .then_with(|| b.is_hot.cmp(&a.is_hot))
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
    promos
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn promo(
        id: i64,
        is_hot: bool,
        is_recommended: bool,
        created_days_ago: i64,
    ) -> promo_code::Model {
        promo_code::Model {
            id,
            title: format!("promo-{}", id),
            code: format!("CODE{}", id),
            store_id: None,
            is_hot,
            is_recommended,
            is_active: true,
            expires_at: None,
            created_at: Utc::now() - Duration::days(created_days_ago),
        }
    }

    fn ids(promos: &[promo_code::Model]) -> Vec<i64> {
        promos.iter().map(|p| p.id).collect()
    }

    #[test]
    fn test_badge_beats_usage_beats_recency() {
        // A: 热门、零使用、最老；B: 无徽章、高使用；C: 无徽章、零使用、最新
        let a = promo(1, true, false, 30);
        let b = promo(2, false, false, 20);
        let c = promo(3, false, false, 1);

        let usage = HashMap::from([(2, 1000)]);
        let ranked = rank_promos(vec![c, b, a], &usage);
        assert_eq!(ids(&ranked), vec![1, 2, 3]);
    }

    #[test]
    fn test_hot_and_recommended_are_one_tier() {
        // 同档位内按使用量分高下，而不是推荐压过热门
        let hot = promo(1, true, false, 10);
        let recommended = promo(2, false, true, 10);

        let usage = HashMap::from([(1, 5), (2, 50)]);
        let ranked = rank_promos(vec![hot, recommended], &usage);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn test_equal_usage_ties_break_by_recency() {
        let older = promo(1, false, false, 10);
        let newer = promo(2, false, false, 2);

        let usage = HashMap::from([(1, 7), (2, 7)]);
        let ranked = rank_promos(vec![older, newer], &usage);
        assert_eq!(ids(&ranked), vec![2, 1]);
    }

    #[test]
    fn test_missing_usage_counts_as_zero() {
        let known = promo(1, false, false, 10);
        let unknown = promo(2, false, false, 10);

        let usage = HashMap::from([(1, 1)]);
        let ranked = rank_promos(vec![unknown, known], &usage);
        assert_eq!(ids(&ranked), vec![1, 2]);
    }

    #[test]
    fn test_default_order_recommended_first() {
        let plain_new = promo(1, false, false, 1);
        let hot = promo(2, true, false, 10);
        let recommended = promo(3, false, true, 20);

        let ordered = default_order(vec![plain_new, hot, recommended]);
        assert_eq!(ids(&ordered), vec![3, 2, 1]);
    }
}
