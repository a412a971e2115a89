use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Income or expense. Serialized with the Spanish wire names the backend
/// stores in the `type` column.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum TransactionKind {
    #[serde(rename = "Ingreso")]
    Income,
    #[serde(rename = "Gasto")]
    Expense,
}

impl TransactionKind {
    pub fn label(&self) -> &'static str {
        match self {
            TransactionKind::Income => "Ingreso",
            TransactionKind::Expense => "Gasto",
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct EntityInput {
    pub name: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub entity_id: String,
    /// Present on joined reads (`select=*,entity:entities(*)`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<Entity>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Clone, PartialEq, Debug, Serialize)]
pub struct TransactionInput {
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub category: String,
    pub amount: f64,
    pub description: String,
    pub date: NaiveDate,
    pub entity_id: String,
}

/// Partial update payload; only the present fields reach the server.
#[derive(Clone, PartialEq, Debug, Default, Serialize)]
pub struct TransactionPatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,
}

/// Full category row as stored in the `categories` table. The combo boxes
/// only care about names; the management modal needs the metadata.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub is_default: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

pub const INCOME_CATEGORIES: &[&str] = &[
    "Efectivo",
    "Transferencia",
    "Depósitos Bancarios",
    "Yape",
    "Préstamo",
];

pub const EXPENSE_CATEGORIES: &[&str] = &[
    "Depósito en Banco",
    "Transferencia",
    "Yape",
    "Plin",
    "Efectivo",
    "Pagos Varios",
];

pub fn default_categories(kind: TransactionKind) -> &'static [&'static str] {
    match kind {
        TransactionKind::Income => INCOME_CATEGORIES,
        TransactionKind::Expense => EXPENSE_CATEGORIES,
    }
}

/// Primary view of the finance page.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum View {
    Transactions,
    Reports,
}

impl View {
    pub fn label(&self) -> &'static str {
        match self {
            View::Transactions => "Transacciones",
            View::Reports => "Reportes",
        }
    }
}

/// Sub-filter inside the transactions view.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViewFilter {
    All,
    Income,
    Expense,
}

impl ViewFilter {
    pub fn label(&self) -> &'static str {
        match self {
            ViewFilter::All => "Todos",
            ViewFilter::Income => "Ingresos",
            ViewFilter::Expense => "Egresos",
        }
    }
}

/// Sentinel used by the entity filter boxes for "no filter".
pub const ALL_ENTITIES: &str = "all";
pub const ALL_ENTITIES_LABEL: &str = "Todas las Entidades";

#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub struct Stats {
    pub total_income: f64,
    pub total_expenses: f64,
    pub balance: f64,
}

pub fn stats(transactions: &[Transaction]) -> Stats {
    let total_income: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Income)
        .map(|t| t.amount)
        .sum();
    let total_expenses: f64 = transactions
        .iter()
        .filter(|t| t.kind == TransactionKind::Expense)
        .map(|t| t.amount)
        .sum();
    Stats {
        total_income,
        total_expenses,
        balance: total_income - total_expenses,
    }
}

/// Entities are kept alphabetical by name, case-insensitively.
pub fn sort_entities(entities: &mut [Entity]) {
    entities.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
}

/// Transactions are kept newest-first: date descending, then creation time
/// descending for same-day rows.
pub fn sort_transactions(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| {
        b.date
            .cmp(&a.date)
            .then_with(|| b.created_at.cmp(&a.created_at))
    });
}

pub fn find_entity_by_name<'a>(entities: &'a [Entity], name: &str) -> Option<&'a Entity> {
    entities
        .iter()
        .find(|e| e.name.to_lowercase() == name.to_lowercase())
}

pub fn filter_by_kind(transactions: &[Transaction], kind: TransactionKind) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| t.kind == kind)
        .cloned()
        .collect()
}

/// `entity_filter` is either [`ALL_ENTITIES`] or an entity id.
pub fn filter_by_entity(transactions: &[Transaction], entity_filter: &str) -> Vec<Transaction> {
    if entity_filter == ALL_ENTITIES {
        return transactions.to_vec();
    }
    transactions
        .iter()
        .filter(|t| t.entity_id == entity_filter)
        .cloned()
        .collect()
}

pub fn filter_by_date_range(
    transactions: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|t| t.date >= start && t.date <= end)
        .cloned()
        .collect()
}

/// Assumes the slice is already in display order (newest first).
pub fn recent(transactions: &[Transaction], limit: usize) -> Vec<Transaction> {
    transactions.iter().take(limit).cloned().collect()
}

/// Default categories for the kind unioned with the custom ones from the
/// database, de-duplicated preserving first occurrence.
pub fn combo_candidates(defaults: &[&str], custom: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(defaults.len() + custom.len());
    for name in defaults.iter().map(|s| s.to_string()).chain(custom.iter().cloned()) {
        if !out.iter().any(|existing| existing == &name) {
            out.push(name);
        }
    }
    out
}

/// Case-insensitive substring filter over combo candidates.
pub fn filter_candidates(candidates: &[String], term: &str) -> Vec<String> {
    let needle = term.to_lowercase();
    candidates
        .iter()
        .filter(|c| c.to_lowercase().contains(&needle))
        .cloned()
        .collect()
}

pub fn has_exact_match(candidates: &[String], term: &str) -> bool {
    let needle = term.to_lowercase();
    candidates.iter().any(|c| c.to_lowercase() == needle)
}

/// The create affordance shows when the search term is non-empty and does
/// not exactly match an existing candidate.
pub fn show_create_option(candidates: &[String], term: &str) -> bool {
    !term.trim().is_empty() && !has_exact_match(candidates, term)
}

/// Outcome of pressing Enter in a creatable combo box. Creation wins over
/// selecting the sole remaining match; an in-flight create falls through
/// to selection.
#[derive(Clone, PartialEq, Debug)]
pub enum EnterAction {
    Create(String),
    Select(String),
    Ignore,
}

pub fn enter_action(filtered: &[String], term: &str, creating: bool) -> EnterAction {
    if !creating && show_create_option(filtered, term) {
        EnterAction::Create(term.trim().to_string())
    } else if filtered.len() == 1 {
        EnterAction::Select(filtered[0].clone())
    } else {
        EnterAction::Ignore
    }
}

/// Sole visible row of the entity filter for a search term, if exactly one
/// remains. The fixed "all entities" row counts like any other.
pub fn sole_filter_choice(entities: &[Entity], term: &str) -> Option<String> {
    let needle = term.to_lowercase();
    let all_visible = needle.is_empty() || ALL_ENTITIES_LABEL.to_lowercase().contains(&needle);
    let mut matches = entities
        .iter()
        .filter(|e| e.name.to_lowercase().contains(&needle));
    match (all_visible, matches.next(), matches.next()) {
        (true, None, _) => Some(ALL_ENTITIES.to_string()),
        (false, Some(only), None) => Some(only.id.clone()),
        _ => None,
    }
}

pub fn format_amount(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as i64;
    let whole = cents / 100;
    let frac = cents % 100;
    let mut grouped = String::new();
    let digits = whole.to_string();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}.{:02}", if negative { "-" } else { "" }, grouped, frac)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: &str, name: &str) -> Entity {
        Entity {
            id: id.into(),
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }

    fn tx(id: &str, kind: TransactionKind, amount: f64, date: &str, created: &str) -> Transaction {
        Transaction {
            id: id.into(),
            kind,
            category: "Efectivo".into(),
            amount,
            description: format!("tx {id}"),
            date: date.parse().unwrap(),
            entity_id: "e1".into(),
            entity: None,
            created_at: Some(created.into()),
            updated_at: None,
        }
    }

    #[test]
    fn stats_sums_by_kind() {
        let txs = vec![
            tx("1", TransactionKind::Income, 100.0, "2025-01-10", "a"),
            tx("2", TransactionKind::Expense, 40.0, "2025-01-11", "b"),
            tx("3", TransactionKind::Expense, 10.0, "2025-01-12", "c"),
        ];
        let s = stats(&txs);
        assert_eq!(s.total_income, 100.0);
        assert_eq!(s.total_expenses, 50.0);
        assert_eq!(s.balance, 50.0);
    }

    #[test]
    fn stats_empty_is_zero() {
        let s = stats(&[]);
        assert_eq!(s.total_income, 0.0);
        assert_eq!(s.total_expenses, 0.0);
        assert_eq!(s.balance, 0.0);
    }

    #[test]
    fn entities_sort_alphabetically_case_insensitive() {
        let mut list = vec![entity("1", "zeta"), entity("2", "Alfa"), entity("3", "beta")];
        sort_entities(&mut list);
        let names: Vec<_> = list.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Alfa", "beta", "zeta"]);
    }

    #[test]
    fn transactions_sort_date_then_creation_descending() {
        let mut list = vec![
            tx("old", TransactionKind::Income, 1.0, "2025-01-01", "2025-01-01T08:00:00"),
            tx("new", TransactionKind::Income, 1.0, "2025-02-01", "2025-02-01T08:00:00"),
            tx("same_day_late", TransactionKind::Income, 1.0, "2025-02-01", "2025-02-01T12:00:00"),
        ];
        sort_transactions(&mut list);
        let ids: Vec<_> = list.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["same_day_late", "new", "old"]);
    }

    #[test]
    fn find_entity_ignores_case() {
        let list = vec![entity("1", "Banco de Crédito")];
        assert!(find_entity_by_name(&list, "banco de crédito").is_some());
        assert!(find_entity_by_name(&list, "BANCO DE CRÉDITO").is_some());
        assert!(find_entity_by_name(&list, "otro").is_none());
    }

    #[test]
    fn filter_by_entity_all_keeps_everything() {
        let txs = vec![
            tx("1", TransactionKind::Income, 1.0, "2025-01-01", "a"),
            tx("2", TransactionKind::Expense, 1.0, "2025-01-02", "b"),
        ];
        assert_eq!(filter_by_entity(&txs, ALL_ENTITIES).len(), 2);
        assert_eq!(filter_by_entity(&txs, "e1").len(), 2);
        assert_eq!(filter_by_entity(&txs, "missing").len(), 0);
    }

    #[test]
    fn date_range_is_inclusive() {
        let txs = vec![
            tx("1", TransactionKind::Income, 1.0, "2025-01-01", "a"),
            tx("2", TransactionKind::Income, 1.0, "2025-01-15", "b"),
            tx("3", TransactionKind::Income, 1.0, "2025-02-01", "c"),
        ];
        let hits = filter_by_date_range(
            &txs,
            "2025-01-01".parse().unwrap(),
            "2025-01-31".parse().unwrap(),
        );
        assert_eq!(hits.len(), 2);
    }

    #[test]
    fn combo_filter_matches_substring_case_insensitive() {
        let candidates: Vec<String> = ["Efectivo", "Yape", "Plin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(filter_candidates(&candidates, "ya"), vec!["Yape".to_string()]);
    }

    #[test]
    fn exact_match_suppresses_create_option() {
        let candidates: Vec<String> = ["Efectivo", "Yape", "Plin"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert!(!show_create_option(&candidates, "Efectivo"));
        assert!(!show_create_option(&candidates, "efectivo"));
        assert!(show_create_option(&candidates, "Nuevo"));
        assert!(!show_create_option(&candidates, ""));
        assert!(!show_create_option(&candidates, "   "));
    }

    #[test]
    fn enter_prefers_creation_over_the_sole_match() {
        let filtered = vec!["Yape".to_string()];
        assert_eq!(
            enter_action(&filtered, "Yap", false),
            EnterAction::Create("Yap".into())
        );
        assert_eq!(
            enter_action(&filtered, "Yape", false),
            EnterAction::Select("Yape".into())
        );
    }

    #[test]
    fn enter_during_inflight_create_falls_back_to_selection() {
        let filtered = vec!["Yape".to_string()];
        assert_eq!(
            enter_action(&filtered, "Yap", true),
            EnterAction::Select("Yape".into())
        );
        assert_eq!(enter_action(&[], "Yap", true), EnterAction::Ignore);
        assert_eq!(enter_action(&filtered, "", false), EnterAction::Select("Yape".into()));
    }

    #[test]
    fn entity_filter_enter_resolves_the_sole_visible_row() {
        let list = vec![
            entity("1", "Banco de Crédito"),
            entity("2", "Caja Piura"),
        ];
        assert_eq!(sole_filter_choice(&list, "banco"), Some("1".to_string()));
        assert_eq!(
            sole_filter_choice(&list, "todas"),
            Some(ALL_ENTITIES.to_string())
        );
        assert_eq!(sole_filter_choice(&list, ""), None);
        assert_eq!(sole_filter_choice(&list, "zzz"), None);
    }

    #[test]
    fn candidates_union_deduplicates() {
        let custom = vec!["Yape".to_string(), "Gimnasio".to_string()];
        let all = combo_candidates(INCOME_CATEGORIES, &custom);
        assert_eq!(all.iter().filter(|c| c.as_str() == "Yape").count(), 1);
        assert!(all.contains(&"Gimnasio".to_string()));
        assert_eq!(all[0], "Efectivo");
    }

    #[test]
    fn kind_uses_spanish_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionKind::Income).unwrap(),
            "\"Ingreso\""
        );
        assert_eq!(
            serde_json::from_str::<TransactionKind>("\"Gasto\"").unwrap(),
            TransactionKind::Expense
        );
    }

    #[test]
    fn amounts_format_with_groups_and_cents() {
        assert_eq!(format_amount(0.0), "0.00");
        assert_eq!(format_amount(1234.5), "1,234.50");
        assert_eq!(format_amount(1234567.891), "1,234,567.89");
        assert_eq!(format_amount(-40.0), "-40.00");
    }

    #[test]
    fn recent_takes_head_of_display_order() {
        let mut txs = vec![
            tx("1", TransactionKind::Income, 1.0, "2025-01-01", "a"),
            tx("2", TransactionKind::Income, 1.0, "2025-01-03", "b"),
            tx("3", TransactionKind::Income, 1.0, "2025-01-02", "c"),
        ];
        sort_transactions(&mut txs);
        let top = recent(&txs, 2);
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].id, "2");
    }
}
