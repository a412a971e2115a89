use std::rc::Rc;

use chrono::NaiveDate;
use serde::Deserialize;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::api::SupabaseClient;
use crate::model::{
    self, CategoryRow, Entity, EntityInput, Stats, Transaction, TransactionInput, TransactionKind,
    TransactionPatch,
};
use crate::session::AppContext;
use crate::toast::Toaster;

/// Joined read: every transaction row carries its entity.
const TX_SELECT: &str = "*,entity:entities(*)";

#[hook]
pub fn use_app_context() -> AppContext {
    use_context::<AppContext>().expect("AppContext no está montado en el árbol")
}

// ---- entities -----------------------------------------------------------

/// Owner of the in-memory entity collection. Every mutator reconciles the
/// collection against the server's confirmed response; failures leave it
/// untouched and raise a toast.
#[derive(Clone)]
pub struct UseEntitiesHandle {
    entities: UseStateHandle<Vec<Entity>>,
    loading: UseStateHandle<bool>,
    error: UseStateHandle<Option<String>>,
    client: Rc<SupabaseClient>,
    toaster: Toaster,
}

impl PartialEq for UseEntitiesHandle {
    fn eq(&self, other: &Self) -> bool {
        self.entities == other.entities
            && self.loading == other.loading
            && self.error == other.error
            && Rc::ptr_eq(&self.client, &other.client)
    }
}

impl UseEntitiesHandle {
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn loading(&self) -> bool {
        *self.loading
    }

    pub fn error(&self) -> Option<String> {
        (*self.error).clone()
    }

    /// Replaces the whole collection with the remote result, alphabetical
    /// by name. On failure the previous collection stays.
    pub async fn fetch(&self) {
        self.loading.set(true);
        match self
            .client
            .select::<Entity>("entities", &[("select", "*"), ("order", "name.asc")])
            .await
        {
            Ok(rows) => {
                self.entities.set(rows);
                self.error.set(None);
            }
            Err(err) => {
                log::error!("error al cargar entidades: {err}");
                self.error.set(Some(err.to_string()));
                self.toaster.error(format!("Error al cargar entidades: {err}"));
            }
        }
        self.loading.set(false);
    }

    /// Find-or-create: an existing case-insensitive match short-circuits
    /// without a remote call. The check-then-insert is not atomic; a
    /// concurrent creator can still produce a duplicate.
    pub async fn create(&self, input: EntityInput) -> Option<Entity> {
        if let Some(existing) = model::find_entity_by_name(&self.entities, &input.name) {
            return Some(existing.clone());
        }

        match self
            .client
            .insert_one::<_, Entity>("entities", &input, "*")
            .await
        {
            Ok(created) => {
                let mut next = (*self.entities).clone();
                next.push(created.clone());
                model::sort_entities(&mut next);
                self.entities.set(next);
                self.toaster.success("Entidad creada exitosamente");
                Some(created)
            }
            Err(err) => {
                log::error!("error al crear entidad: {err}");
                self.toaster.error(format!("Error al crear entidad: {err}"));
                None
            }
        }
    }

    pub async fn rename(&self, id: &str, name: &str) -> bool {
        let input = EntityInput {
            name: name.trim().to_string(),
        };
        match self
            .client
            .update_one::<_, Entity>("entities", &[("id", &format!("eq.{id}"))], &input, "*")
            .await
        {
            Ok(updated) => {
                let mut next = (*self.entities).clone();
                if let Some(slot) = next.iter_mut().find(|e| e.id == updated.id) {
                    *slot = updated;
                }
                model::sort_entities(&mut next);
                self.entities.set(next);
                self.toaster.success("Entidad actualizada exitosamente");
                true
            }
            Err(err) => {
                log::error!("error al actualizar entidad: {err}");
                self.toaster
                    .error(format!("Error al actualizar entidad: {err}"));
                false
            }
        }
    }

    /// Refuses when any transaction still references the entity, checked
    /// with a pre-flight count query.
    pub async fn delete(&self, id: &str) -> bool {
        match self
            .client
            .count("transactions", &[("entity_id", &format!("eq.{id}"))])
            .await
        {
            Ok(0) => {}
            Ok(_) => {
                self.toaster
                    .error("No se puede eliminar la entidad porque tiene transacciones asociadas");
                return false;
            }
            Err(err) => {
                log::error!("error al contar transacciones de la entidad: {err}");
                self.toaster
                    .error(format!("Error al eliminar entidad: {err}"));
                return false;
            }
        }

        match self
            .client
            .delete_where("entities", &[("id", &format!("eq.{id}"))])
            .await
        {
            Ok(()) => {
                let mut next = (*self.entities).clone();
                next.retain(|e| e.id != id);
                self.entities.set(next);
                self.toaster.success("Entidad eliminada exitosamente");
                true
            }
            Err(err) => {
                log::error!("error al eliminar entidad: {err}");
                self.toaster
                    .error(format!("Error al eliminar entidad: {err}"));
                false
            }
        }
    }

    pub async fn find_or_create(&self, name: &str) -> Option<Entity> {
        if let Some(existing) = model::find_entity_by_name(&self.entities, name) {
            return Some(existing.clone());
        }
        self.create(EntityInput {
            name: name.trim().to_string(),
        })
        .await
    }
}

#[hook]
pub fn use_entities() -> UseEntitiesHandle {
    let ctx = use_app_context();
    let handle = UseEntitiesHandle {
        entities: use_state(Vec::new),
        loading: use_state(|| true),
        error: use_state(|| None),
        client: Rc::clone(&ctx.client),
        toaster: ctx.toaster.clone(),
    };

    {
        let handle = handle.clone();
        use_effect_with_deps(
            move |_| {
                spawn_local(async move { handle.fetch().await });
                || ()
            },
            (),
        );
    }

    handle
}

// ---- categories ---------------------------------------------------------

#[derive(Deserialize)]
struct CategoryName {
    name: String,
}

#[derive(Clone)]
pub struct UseCategoriesHandle {
    names: UseStateHandle<Vec<String>>,
    loading: UseStateHandle<bool>,
    client: Rc<SupabaseClient>,
    toaster: Toaster,
}

impl PartialEq for UseCategoriesHandle {
    fn eq(&self, other: &Self) -> bool {
        self.names == other.names
            && self.loading == other.loading
            && Rc::ptr_eq(&self.client, &other.client)
    }
}

impl UseCategoriesHandle {
    /// Category names across both kinds, defaults first.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn loading(&self) -> bool {
        *self.loading
    }

    pub async fn fetch(&self) {
        self.loading.set(true);
        match self
            .client
            .select::<CategoryName>(
                "categories",
                &[("select", "name"), ("order", "is_default.desc,name.asc")],
            )
            .await
        {
            Ok(rows) => self.names.set(rows.into_iter().map(|c| c.name).collect()),
            Err(err) => {
                log::error!("error al cargar categorías: {err}");
                self.toaster.error("Error al cargar las categorías");
            }
        }
        self.loading.set(false);
    }

    /// Kind-scoped names, straight from the server. Errors degrade to an
    /// empty list; the combo still offers the fixed defaults.
    pub async fn names_by_kind(&self, kind: TransactionKind) -> Vec<String> {
        match self
            .client
            .select::<CategoryName>(
                "categories",
                &[
                    ("select", "name"),
                    ("type", &format!("eq.{}", kind.label())),
                    ("order", "is_default.desc,name.asc"),
                ],
            )
            .await
        {
            Ok(rows) => rows.into_iter().map(|c| c.name).collect(),
            Err(err) => {
                log::error!("error al cargar categorías por tipo: {err}");
                Vec::new()
            }
        }
    }

    /// Full rows for the management modal.
    pub async fn rows_by_kind(&self, kind: TransactionKind) -> Option<Vec<CategoryRow>> {
        match self
            .client
            .select::<CategoryRow>(
                "categories",
                &[
                    ("select", "*"),
                    ("type", &format!("eq.{}", kind.label())),
                    ("order", "is_default.desc,name.asc"),
                ],
            )
            .await
        {
            Ok(rows) => Some(rows),
            Err(err) => {
                log::error!("error al cargar categorías: {err}");
                self.toaster.error("Error al cargar las categorías");
                None
            }
        }
    }

    /// Remote existence check scoped to (name, kind), then insert. The
    /// check-then-insert window is accepted; uniqueness belongs to the
    /// backend constraint.
    pub async fn find_or_create(&self, name: &str, kind: TransactionKind) -> Option<String> {
        let trimmed = name.trim();

        match self
            .client
            .select_first::<CategoryName>(
                "categories",
                &[
                    ("select", "name"),
                    ("name", &format!("eq.{trimmed}")),
                    ("type", &format!("eq.{}", kind.label())),
                ],
            )
            .await
        {
            Ok(Some(existing)) => {
                self.toaster.success("Categoría encontrada");
                return Some(existing.name);
            }
            Ok(None) => {}
            Err(err) => {
                log::error!("error al buscar categoría: {err}");
                self.toaster.error("Error al crear la categoría");
                return None;
            }
        }

        let body = serde_json::json!({
            "name": trimmed,
            "type": kind.label(),
            "is_default": false,
        });
        match self
            .client
            .insert_one::<_, CategoryName>("categories", &body, "name")
            .await
        {
            Ok(created) => {
                self.toaster
                    .success(format!("Categoría \"{trimmed}\" creada exitosamente"));
                self.fetch().await;
                Some(created.name)
            }
            Err(err) => {
                log::error!("error al crear categoría: {err}");
                self.toaster.error("Error al crear la categoría");
                None
            }
        }
    }

    /// Rename a custom category. The filter is scoped to non-default rows,
    /// so defaults cannot be touched from this client.
    pub async fn rename(&self, id: &str, name: &str) -> bool {
        let body = serde_json::json!({ "name": name.trim() });
        match self
            .client
            .update_one::<_, CategoryRow>(
                "categories",
                &[("id", &format!("eq.{id}")), ("is_default", "eq.false")],
                &body,
                "*",
            )
            .await
        {
            Ok(_) => {
                self.toaster.success("Categoría actualizada exitosamente");
                self.fetch().await;
                true
            }
            Err(err) => {
                log::error!("error al actualizar categoría: {err}");
                self.toaster.error("Error al actualizar la categoría");
                false
            }
        }
    }

    /// Deletion is implicitly refused for defaults: the filter only ever
    /// matches non-default rows.
    pub async fn delete(&self, name: &str, kind: TransactionKind) -> bool {
        match self
            .client
            .delete_where(
                "categories",
                &[
                    ("name", &format!("eq.{name}")),
                    ("type", &format!("eq.{}", kind.label())),
                    ("is_default", "eq.false"),
                ],
            )
            .await
        {
            Ok(()) => {
                self.toaster
                    .success(format!("Categoría \"{name}\" eliminada exitosamente"));
                self.fetch().await;
                true
            }
            Err(err) => {
                log::error!("error al eliminar categoría: {err}");
                self.toaster.error("Error al eliminar la categoría");
                false
            }
        }
    }
}

#[hook]
pub fn use_categories() -> UseCategoriesHandle {
    let ctx = use_app_context();
    let handle = UseCategoriesHandle {
        names: use_state(Vec::new),
        loading: use_state(|| true),
        client: Rc::clone(&ctx.client),
        toaster: ctx.toaster.clone(),
    };

    {
        let handle = handle.clone();
        use_effect_with_deps(
            move |_| {
                spawn_local(async move { handle.fetch().await });
                || ()
            },
            (),
        );
    }

    handle
}

// ---- transactions -------------------------------------------------------

#[derive(Clone)]
pub struct UseTransactionsHandle {
    transactions: UseStateHandle<Vec<Transaction>>,
    loading: UseStateHandle<bool>,
    error: UseStateHandle<Option<String>>,
    client: Rc<SupabaseClient>,
    toaster: Toaster,
}

impl PartialEq for UseTransactionsHandle {
    fn eq(&self, other: &Self) -> bool {
        self.transactions == other.transactions
            && self.loading == other.loading
            && self.error == other.error
            && Rc::ptr_eq(&self.client, &other.client)
    }
}

impl UseTransactionsHandle {
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn loading(&self) -> bool {
        *self.loading
    }

    pub fn error(&self) -> Option<String> {
        (*self.error).clone()
    }

    /// Joined fetch, newest first (date, then creation time).
    pub async fn fetch(&self) {
        self.loading.set(true);
        match self
            .client
            .select::<Transaction>(
                "transactions",
                &[("select", TX_SELECT), ("order", "date.desc,created_at.desc")],
            )
            .await
        {
            Ok(rows) => {
                self.transactions.set(rows);
                self.error.set(None);
            }
            Err(err) => {
                log::error!("error al cargar transacciones: {err}");
                self.error.set(Some(err.to_string()));
                self.toaster
                    .error(format!("Error al cargar transacciones: {err}"));
            }
        }
        self.loading.set(false);
    }

    /// Always a remote insert; the server-returned row (with its joined
    /// entity) is merged in display order.
    pub async fn create(&self, input: TransactionInput) -> bool {
        match self
            .client
            .insert_one::<_, Transaction>("transactions", &input, TX_SELECT)
            .await
        {
            Ok(created) => {
                let mut next = (*self.transactions).clone();
                next.insert(0, created);
                model::sort_transactions(&mut next);
                self.transactions.set(next);
                self.toaster.success("Transacción creada exitosamente");
                true
            }
            Err(err) => {
                log::error!("error al crear transacción: {err}");
                self.toaster
                    .error(format!("Error al crear transacción: {err}"));
                false
            }
        }
    }

    pub async fn update(&self, id: &str, patch: TransactionPatch) -> bool {
        match self
            .client
            .update_one::<_, Transaction>(
                "transactions",
                &[("id", &format!("eq.{id}"))],
                &patch,
                TX_SELECT,
            )
            .await
        {
            Ok(updated) => {
                let mut next = (*self.transactions).clone();
                if let Some(slot) = next.iter_mut().find(|t| t.id == updated.id) {
                    *slot = updated;
                }
                model::sort_transactions(&mut next);
                self.transactions.set(next);
                self.toaster.success("Transacción actualizada exitosamente");
                true
            }
            Err(err) => {
                log::error!("error al actualizar transacción: {err}");
                self.toaster
                    .error(format!("Error al actualizar transacción: {err}"));
                false
            }
        }
    }

    pub async fn delete(&self, id: &str) -> bool {
        match self
            .client
            .delete_where("transactions", &[("id", &format!("eq.{id}"))])
            .await
        {
            Ok(()) => {
                let mut next = (*self.transactions).clone();
                next.retain(|t| t.id != id);
                self.transactions.set(next);
                self.toaster.success("Transacción eliminada exitosamente");
                true
            }
            Err(err) => {
                log::error!("error al eliminar transacción: {err}");
                self.toaster
                    .error(format!("Error al eliminar transacción: {err}"));
                false
            }
        }
    }

    pub fn stats(&self) -> Stats {
        model::stats(&self.transactions)
    }

    pub fn by_kind(&self, kind: TransactionKind) -> Vec<Transaction> {
        model::filter_by_kind(&self.transactions, kind)
    }

    pub fn by_date_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Transaction> {
        model::filter_by_date_range(&self.transactions, start, end)
    }

    pub fn recent(&self, limit: usize) -> Vec<Transaction> {
        model::recent(&self.transactions, limit)
    }
}

#[hook]
pub fn use_transactions() -> UseTransactionsHandle {
    let ctx = use_app_context();
    let handle = UseTransactionsHandle {
        transactions: use_state(Vec::new),
        loading: use_state(|| true),
        error: use_state(|| None),
        client: Rc::clone(&ctx.client),
        toaster: ctx.toaster.clone(),
    };

    {
        let handle = handle.clone();
        use_effect_with_deps(
            move |_| {
                spawn_local(async move { handle.fetch().await });
                || ()
            },
            (),
        );
    }

    handle
}
