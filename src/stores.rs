use std::rc::Rc;

use yew::prelude::*;

use crate::model::{
    self, Entity, Stats, Transaction, TransactionKind, View, ViewFilter, ALL_ENTITIES,
};

/// Ephemeral view state for the finance page: which modal/tab is open and
/// which filters are active. Pure synchronous transitions.
#[derive(Clone, PartialEq, Debug)]
pub struct UiState {
    pub current_view: View,
    pub view_filter: ViewFilter,
    /// [`ALL_ENTITIES`] or an entity id.
    pub entity_filter: String,
    pub transaction_form_visible: bool,
    pub entity_management_visible: bool,
    pub category_management_visible: bool,
    pub mobile_menu_open: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            current_view: View::Transactions,
            view_filter: ViewFilter::All,
            entity_filter: ALL_ENTITIES.to_string(),
            transaction_form_visible: false,
            entity_management_visible: false,
            category_management_visible: false,
            mobile_menu_open: false,
        }
    }
}

pub enum UiAction {
    SetView(View),
    SetViewFilter(ViewFilter),
    SetEntityFilter(String),
    ShowTransactionForm,
    HideTransactionForm,
    ShowEntityManagement,
    HideEntityManagement,
    ShowCategoryManagement,
    HideCategoryManagement,
    ToggleMobileMenu,
    CloseMobileMenu,
    Reset,
}

impl Reducible for UiState {
    type Action = UiAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            UiAction::SetView(view) => {
                next.current_view = view;
                // Leaving the transactions view drops its sub-filter.
                if view != View::Transactions {
                    next.view_filter = ViewFilter::All;
                }
                next.mobile_menu_open = false;
            }
            UiAction::SetViewFilter(filter) => next.view_filter = filter,
            UiAction::SetEntityFilter(entity_id) => next.entity_filter = entity_id,
            UiAction::ShowTransactionForm => next.transaction_form_visible = true,
            UiAction::HideTransactionForm => next.transaction_form_visible = false,
            UiAction::ShowEntityManagement => next.entity_management_visible = true,
            UiAction::HideEntityManagement => next.entity_management_visible = false,
            UiAction::ShowCategoryManagement => next.category_management_visible = true,
            UiAction::HideCategoryManagement => next.category_management_visible = false,
            UiAction::ToggleMobileMenu => next.mobile_menu_open = !next.mobile_menu_open,
            UiAction::CloseMobileMenu => next.mobile_menu_open = false,
            UiAction::Reset => next = UiState::default(),
        }
        Rc::new(next)
    }
}

/// Read replica of the entity hook's collection for decoupled consumers.
/// Synced by the finance page; never the write path.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct EntityStore {
    pub entities: Vec<Entity>,
    pub selected: Option<Entity>,
    pub loading: bool,
    pub error: Option<String>,
}

pub enum EntityStoreAction {
    Set(Vec<Entity>),
    Add(Entity),
    Rename { id: String, name: String },
    Remove(String),
    Select(Option<Entity>),
    SetLoading(bool),
    SetError(Option<String>),
    Clear,
}

impl EntityStore {
    pub fn find_by_name(&self, name: &str) -> Option<&Entity> {
        model::find_entity_by_name(&self.entities, name)
    }
}

impl Reducible for EntityStore {
    type Action = EntityStoreAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            EntityStoreAction::Set(entities) => next.entities = entities,
            EntityStoreAction::Add(entity) => {
                next.entities.push(entity);
                model::sort_entities(&mut next.entities);
            }
            EntityStoreAction::Rename { id, name } => {
                if let Some(entity) = next.entities.iter_mut().find(|e| e.id == id) {
                    entity.name = name;
                }
                model::sort_entities(&mut next.entities);
            }
            EntityStoreAction::Remove(id) => {
                next.entities.retain(|e| e.id != id);
                if next.selected.as_ref().is_some_and(|e| e.id == id) {
                    next.selected = None;
                }
            }
            EntityStoreAction::Select(entity) => next.selected = entity,
            EntityStoreAction::SetLoading(loading) => next.loading = loading,
            EntityStoreAction::SetError(error) => next.error = error,
            EntityStoreAction::Clear => {
                next.entities.clear();
                next.selected = None;
                next.error = None;
            }
        }
        Rc::new(next)
    }
}

/// Read replica of the transaction hook's collection.
#[derive(Clone, PartialEq, Debug, Default)]
pub struct TransactionStore {
    pub transactions: Vec<Transaction>,
    pub selected: Option<Transaction>,
    pub loading: bool,
    pub error: Option<String>,
}

pub enum TransactionStoreAction {
    Set(Vec<Transaction>),
    Add(Transaction),
    Replace(Transaction),
    Remove(String),
    Select(Option<Transaction>),
    SetLoading(bool),
    SetError(Option<String>),
    Clear,
}

impl TransactionStore {
    pub fn stats(&self) -> Stats {
        model::stats(&self.transactions)
    }

    pub fn by_kind(&self, kind: TransactionKind) -> Vec<Transaction> {
        model::filter_by_kind(&self.transactions, kind)
    }

    pub fn by_entity(&self, entity_id: &str) -> Vec<Transaction> {
        model::filter_by_entity(&self.transactions, entity_id)
    }

    pub fn recent(&self, limit: usize) -> Vec<Transaction> {
        model::recent(&self.transactions, limit)
    }
}

impl Reducible for TransactionStore {
    type Action = TransactionStoreAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            TransactionStoreAction::Set(transactions) => next.transactions = transactions,
            TransactionStoreAction::Add(transaction) => {
                next.transactions.insert(0, transaction);
                model::sort_transactions(&mut next.transactions);
            }
            TransactionStoreAction::Replace(transaction) => {
                if let Some(slot) = next
                    .transactions
                    .iter_mut()
                    .find(|t| t.id == transaction.id)
                {
                    *slot = transaction;
                }
            }
            TransactionStoreAction::Remove(id) => {
                next.transactions.retain(|t| t.id != id);
                if next.selected.as_ref().is_some_and(|t| t.id == id) {
                    next.selected = None;
                }
            }
            TransactionStoreAction::Select(transaction) => next.selected = transaction,
            TransactionStoreAction::SetLoading(loading) => next.loading = loading,
            TransactionStoreAction::SetError(error) => next.error = error,
            TransactionStoreAction::Clear => {
                next.transactions.clear();
                next.selected = None;
                next.error = None;
            }
        }
        Rc::new(next)
    }
}

pub type UiHandle = UseReducerHandle<UiState>;
pub type EntityStoreHandle = UseReducerHandle<EntityStore>;
pub type TransactionStoreHandle = UseReducerHandle<TransactionStore>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn switching_to_reports_resets_the_sub_filter() {
        let state = Rc::new(UiState {
            view_filter: ViewFilter::Income,
            mobile_menu_open: true,
            ..Default::default()
        });
        let state = state.reduce(UiAction::SetView(View::Reports));
        assert_eq!(state.current_view, View::Reports);
        assert_eq!(state.view_filter, ViewFilter::All);
        assert!(!state.mobile_menu_open);
    }

    #[test]
    fn staying_on_transactions_keeps_the_sub_filter() {
        let state = Rc::new(UiState {
            view_filter: ViewFilter::Expense,
            ..Default::default()
        });
        let state = state.reduce(UiAction::SetView(View::Transactions));
        assert_eq!(state.view_filter, ViewFilter::Expense);
    }

    #[test]
    fn reset_restores_defaults() {
        let state = Rc::new(UiState {
            current_view: View::Reports,
            entity_filter: "e9".into(),
            transaction_form_visible: true,
            ..Default::default()
        });
        let state = state.reduce(UiAction::Reset);
        assert_eq!(*state, UiState::default());
    }

    fn entity(id: &str, name: &str) -> Entity {
        Entity {
            id: id.into(),
            name: name.into(),
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn entity_add_keeps_alphabetical_order() {
        let store = Rc::new(EntityStore::default());
        let store = store.reduce(EntityStoreAction::Add(entity("1", "Zeta SA")));
        let store = store.reduce(EntityStoreAction::Add(entity("2", "alfa")));
        let names: Vec<_> = store.entities.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["alfa", "Zeta SA"]);
    }

    #[test]
    fn removing_selected_entity_clears_selection() {
        let store = Rc::new(EntityStore::default());
        let store = store.reduce(EntityStoreAction::Add(entity("1", "Alfa")));
        let selected = store.entities[0].clone();
        let store = store.reduce(EntityStoreAction::Select(Some(selected)));
        let store = store.reduce(EntityStoreAction::Remove("1".into()));
        assert!(store.selected.is_none());
        assert!(store.entities.is_empty());
    }

    fn tx(id: &str, kind: TransactionKind, amount: f64) -> Transaction {
        Transaction {
            id: id.into(),
            kind,
            category: "Efectivo".into(),
            amount,
            description: "d".into(),
            date: "2025-03-01".parse().unwrap(),
            entity_id: "e1".into(),
            entity: None,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn replica_stats_sum_by_kind() {
        let store = Rc::new(TransactionStore::default());
        let store = store.reduce(TransactionStoreAction::Set(vec![
            tx("1", TransactionKind::Income, 100.0),
            tx("2", TransactionKind::Expense, 40.0),
            tx("3", TransactionKind::Expense, 10.0),
        ]));
        let stats = store.stats();
        assert_eq!(stats.total_income, 100.0);
        assert_eq!(stats.total_expenses, 50.0);
        assert_eq!(stats.balance, 50.0);
    }

    #[test]
    fn replace_swaps_the_matching_row_only() {
        let store = Rc::new(TransactionStore::default());
        let store = store.reduce(TransactionStoreAction::Set(vec![
            tx("1", TransactionKind::Income, 100.0),
            tx("2", TransactionKind::Expense, 40.0),
        ]));
        let mut updated = tx("2", TransactionKind::Expense, 75.0);
        updated.description = "cambiada".into();
        let store = store.reduce(TransactionStoreAction::Replace(updated));
        assert_eq!(store.transactions[1].amount, 75.0);
        assert_eq!(store.transactions[0].amount, 100.0);
    }
}
