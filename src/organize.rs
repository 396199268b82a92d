// 🛒 Shopping List Organizer - group items by category, order by layout
//
// Layout categories come first in flattened-priority order; everything
// else (Misc included) follows alphabetically. Empty groups never appear.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::category::Category;
use crate::config::Config;
use crate::db::Database;
use crate::error::Error;
use crate::escalation::EscalationChain;
use crate::layout::{LayoutResolver, StoreLayout, StoreRef};
use crate::resolver::ClassificationResolver;

/// One output group: a category label and the names filed under it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemGroup {
    #[serde(rename = "zone")]
    pub label: String,
    pub items: Vec<String>,
}

/// Order classified items by a layout.
/// Items keep the order they were supplied in within each group.
pub fn order_groups<I>(layout: &StoreLayout, classified: I) -> Vec<ItemGroup>
where
    I: IntoIterator<Item = (Category, String)>,
{
    let mut grouped: HashMap<&'static str, Vec<String>> = HashMap::new();
    for (category, name) in classified {
        grouped.entry(category.as_str()).or_default().push(name);
    }

    let mut output = Vec::with_capacity(grouped.len());

    for label in layout.flatten() {
        if let Some(items) = grouped.remove(label.as_str()) {
            output.push(ItemGroup { label, items });
        }
    }

    let mut remaining: Vec<(&'static str, Vec<String>)> = grouped.into_iter().collect();
    remaining.sort_by(|a, b| a.0.cmp(b.0));
    output.extend(remaining.into_iter().map(|(label, items)| ItemGroup {
        label: label.to_string(),
        items,
    }));

    output
}

pub struct Organizer {
    resolver: Arc<ClassificationResolver>,
    layouts: LayoutResolver,
}

impl Organizer {
    pub fn new(resolver: Arc<ClassificationResolver>, layouts: LayoutResolver) -> Self {
        Organizer { resolver, layouts }
    }

    /// Wire the SQLite-backed stores and the configured model chain together
    pub fn from_config(config: &Config, db: Arc<Database>) -> Self {
        let chain = EscalationChain::new(config.model_client(), config.models.clone());
        let resolver = ClassificationResolver::new(db.clone(), chain);
        Organizer::new(Arc::new(resolver), LayoutResolver::new(db))
    }

    pub fn resolver(&self) -> &ClassificationResolver {
        &self.resolver
    }

    pub fn layouts(&self) -> &LayoutResolver {
        &self.layouts
    }

    /// Classify and order a shopping list. Without a store the generic
    /// layout is used; blank entries are skipped.
    pub fn organize<S: AsRef<str>>(
        &self,
        store: Option<&StoreRef>,
        items: &[S],
    ) -> Result<Vec<ItemGroup>, Error> {
        let layout = self.layouts.layout_for(store)?;

        let mut classified = Vec::with_capacity(items.len());
        for item in items {
            let item = item.as_ref();
            if item.trim().is_empty() {
                continue;
            }
            let resolution = self.resolver.resolve(item)?;
            log::debug!(
                "item '{}' classified as {} ('{}', {})",
                item,
                resolution.category,
                resolution.normalized_name,
                resolution.path.as_str()
            );
            classified.push((resolution.category, resolution.normalized_name));
        }

        Ok(order_groups(&layout, classified))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::escalation::tests::{answer, ScriptedClient};
    use crate::layout::{LayoutStore, StoreRegistration, Zone};
    use crate::llm::{ModelClient, ModelTiers};

    fn group(label: &str, items: &[&str]) -> ItemGroup {
        ItemGroup {
            label: label.to_string(),
            items: items.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn test_layout() -> StoreLayout {
        StoreLayout::new(vec![
            Zone::new("Zone1", &["Produce"]),
            Zone::new("Zone2", &["Bakery"]),
            Zone::new("Zone3", &["Deli"]),
            Zone::new("Zone4", &["Pantry"]),
            Zone::new("Zone5", &["Beverages"]),
            Zone::new("Zone6", &["Dairy"]),
            Zone::new("Zone7", &["Frozen"]),
            Zone::new("Zone8", &["Household"]),
        ])
    }

    fn organizer_with(db: Arc<Database>, chain: EscalationChain) -> Organizer {
        let resolver = ClassificationResolver::new(db.clone(), chain);
        Organizer::new(Arc::new(resolver), LayoutResolver::new(db))
    }

    fn seeded_db() -> Arc<Database> {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.register_layout(&StoreRegistration {
            name: "Trader Joe's".to_string(),
            chain: Some("Trader Joe's".to_string()),
            city: Some("Denville".to_string()),
            state: Some("NJ".to_string()),
            postal_code: Some("07834".to_string()),
            zones: test_layout().zones,
        })
        .unwrap();
        db
    }

    #[test]
    fn test_order_groups_layout_then_alphabetical() {
        let layout = StoreLayout::new(vec![
            Zone::new("Front", &["Produce"]),
            Zone::new("Back", &["Dairy"]),
        ]);
        let classified = vec![
            (Category::Snacks, "Popcorn".to_string()),
            (Category::Dairy, "Milk".to_string()),
            (Category::Seafood, "Shrimp".to_string()),
            (Category::Produce, "Apple".to_string()),
        ];

        assert_eq!(
            order_groups(&layout, classified),
            vec![
                group("Produce", &["Apple"]),
                group("Dairy", &["Milk"]),
                group("Seafood", &["Shrimp"]),
                group("Snacks", &["Popcorn"]),
            ]
        );
    }

    #[test]
    fn test_order_groups_skips_empty_categories() {
        let groups = order_groups(&test_layout(), vec![(Category::Frozen, "Peas".to_string())]);
        assert_eq!(groups, vec![group("Frozen", &["Peas"])]);
    }

    #[test]
    fn test_order_groups_empty_layout_is_alphabetical() {
        let groups = order_groups(
            &StoreLayout::default(),
            vec![
                (Category::Produce, "Kale".to_string()),
                (Category::Misc, "Gift Card".to_string()),
                (Category::Dairy, "Milk".to_string()),
            ],
        );
        let labels: Vec<&str> = groups.iter().map(|g| g.label.as_str()).collect();
        assert_eq!(labels, vec!["Dairy", "Misc", "Produce"]);
    }

    #[test]
    fn test_end_to_end_store_by_name() {
        let organizer = organizer_with(seeded_db(), EscalationChain::heuristic_only());
        let items = ["Bananas", "spinach", "sour dough", "greek yogurt", "ice cream", "milk"];

        let groups = organizer
            .organize(Some(&StoreRef::named("Trader Joe's", None)), &items)
            .unwrap();

        assert_eq!(
            groups,
            vec![
                group("Produce", &["Bananas", "Spinach"]),
                group("Bakery", &["Sour Dough"]),
                group("Dairy", &["Greek Yogurt", "Milk"]),
                group("Frozen", &["Ice Cream"]),
            ]
        );
    }

    #[test]
    fn test_end_to_end_store_by_id() {
        let db = seeded_db();
        let store_id = db.find_store("Trader Joe's", Some("07834")).unwrap().unwrap().store_id;
        let organizer = organizer_with(db, EscalationChain::heuristic_only());

        let groups = organizer
            .organize(Some(&StoreRef::Id(store_id)), &["milk", "bananas"])
            .unwrap();
        assert_eq!(groups[0], group("Produce", &["Bananas"]));
        assert_eq!(groups[1], group("Dairy", &["Milk"]));
    }

    #[test]
    fn test_no_store_uses_generic_layout() {
        let organizer = organizer_with(seeded_db(), EscalationChain::heuristic_only());
        let groups = organizer.organize(None, &["milk"]).unwrap();
        assert_eq!(groups, vec![group("Dairy", &["Milk"])]);
    }

    #[test]
    fn test_misc_appended_after_layout() {
        let organizer = organizer_with(seeded_db(), EscalationChain::heuristic_only());
        let groups = organizer
            .organize(Some(&StoreRef::named("Trader Joe's", None)), &["quirky item", "milk"])
            .unwrap();
        assert_eq!(
            groups,
            vec![group("Dairy", &["Milk"]), group("Misc", &["Quirky Item"])]
        );
    }

    #[test]
    fn test_unknown_store_name_is_signalled() {
        let organizer = organizer_with(seeded_db(), EscalationChain::heuristic_only());
        let err = organizer
            .organize(Some(&StoreRef::named("Aldi", Some("07054"))), &["milk"])
            .unwrap_err();
        assert!(matches!(err, Error::StoreNotFound { .. }));
    }

    #[test]
    fn test_blank_items_are_skipped() {
        let organizer = organizer_with(seeded_db(), EscalationChain::heuristic_only());
        let groups = organizer.organize(None, &["", "  ", "milk"]).unwrap();
        assert_eq!(groups, vec![group("Dairy", &["Milk"])]);
    }

    #[test]
    fn test_model_classification_flows_through() {
        let client = ScriptedClient::new(vec![answer("Produce", "Quirky Item")]);
        let chain = EscalationChain::new(Some(client as Arc<dyn ModelClient>), ModelTiers::default());
        let organizer = organizer_with(seeded_db(), chain);

        let groups = organizer
            .organize(Some(&StoreRef::named("Trader Joe's", None)), &["quirky item"])
            .unwrap();
        assert_eq!(groups, vec![group("Produce", &["Quirky Item"])]);
    }

    #[test]
    fn test_invalid_model_answer_falls_back_to_heuristics() {
        let client = ScriptedClient::new(vec![crate::llm::ModelOutcome::Ok("NOT JSON".to_string())]);
        let chain = EscalationChain::new(Some(client as Arc<dyn ModelClient>), ModelTiers::default());
        let organizer = organizer_with(seeded_db(), chain);

        let groups = organizer
            .organize(Some(&StoreRef::named("Trader Joe's", None)), &["salmon fillet"])
            .unwrap();
        assert_eq!(groups, vec![group("Seafood", &["Salmon Fillet"])]);
    }

    #[test]
    fn test_item_group_serializes_as_zone() {
        let json = serde_json::to_value(group("Dairy", &["Milk"])).unwrap();
        assert_eq!(json, serde_json::json!({"zone": "Dairy", "items": ["Milk"]}));
    }
}
