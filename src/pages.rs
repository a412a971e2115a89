use chrono::NaiveDate;
use wasm_bindgen_futures::spawn_local;
use yew::events::SubmitEvent;
use yew::prelude::*;
use yew_router::prelude::*;

use crate::api::{classify_redirect_error, take_auth_redirect_error, DenialKind};
use crate::hooks::{
    use_app_context, use_categories, use_entities, use_transactions, UseCategoriesHandle,
    UseEntitiesHandle, UseTransactionsHandle,
};
use crate::model::{
    self, CategoryRow, Entity, Transaction, TransactionInput, TransactionKind, TransactionPatch,
    View, ViewFilter, ALL_ENTITIES,
};
use crate::session::{gate, Gate, NOT_AUTHORIZED_MSG};
use crate::stores::{
    EntityStoreAction, EntityStoreHandle, TransactionStoreAction, TransactionStoreHandle, UiAction,
    UiHandle,
};
use crate::widgets::{
    icon_bar_chart, icon_layout_grid, icon_pencil, icon_plus, icon_settings, icon_trash,
    CategoryComboBox, EntityComboBox, EntitySearchBox, Modal, SummaryCards, TransactionList,
};
use crate::Route;

#[hook]
fn use_ui() -> UiHandle {
    use_context::<UiHandle>().expect("UiState no está montado en el árbol")
}

#[hook]
fn use_entity_store() -> EntityStoreHandle {
    use_context::<EntityStoreHandle>().expect("EntityStore no está montado en el árbol")
}

#[hook]
fn use_transaction_store() -> TransactionStoreHandle {
    use_context::<TransactionStoreHandle>().expect("TransactionStore no está montado en el árbol")
}

// ---- login --------------------------------------------------------------

#[function_component(LoginPage)]
pub fn login_page() -> Html {
    let ctx = use_app_context();
    let navigator = use_navigator();

    // A rejected redirect lands back here with error keys in the URL; read
    // them once, strip them, and surface a single toast.
    {
        let toaster = ctx.toaster.clone();
        use_effect_with_deps(
            move |_| {
                if let Some(err) = take_auth_redirect_error() {
                    let message = match classify_redirect_error(&err) {
                        DenialKind::NotAuthorized => NOT_AUTHORIZED_MSG.to_string(),
                        DenialKind::AccessDenied => {
                            "Acceso denegado por el proveedor.".to_string()
                        }
                        DenialKind::Generic => err.description.unwrap_or_else(|| {
                            "Error al iniciar sesión. Por favor, inténtalo de nuevo.".to_string()
                        }),
                    };
                    toaster.error(message);
                }
                || ()
            },
            (),
        );
    }

    // Already signed in means nothing to do here.
    {
        let navigator = navigator.clone();
        use_effect_with_deps(
            move |gate_now| {
                if *gate_now == Gate::SignedIn {
                    if let Some(navigator) = navigator {
                        navigator.push(&Route::Dashboard);
                    }
                }
                || ()
            },
            gate(&ctx.session),
        );
    }

    let loading = ctx.session.loading;
    let on_google = {
        let ctx = ctx.clone();
        Callback::from(move |_: MouseEvent| ctx.sign_in_with_google())
    };

    html! {
        <div class="min-h-screen flex items-center justify-center bg-background px-4">
            <div class="w-full max-w-sm rounded-2xl border bg-card p-8 shadow-lg text-center">
                <h1 class="text-2xl font-bold">{ "Conusper Finanzas" }</h1>
                <p class="mt-2 text-sm text-muted-foreground">
                    { "Control de ingresos y egresos" }
                </p>
                <button
                    class="mt-8 w-full rounded-lg border bg-background px-4 py-2.5 text-sm font-medium hover:bg-muted disabled:opacity-50"
                    onclick={on_google}
                    disabled={loading}
                >
                    { if loading { "Redirigiendo..." } else { "Continuar con Google" } }
                </button>
                <p class="mt-6 text-xs text-muted-foreground">
                    { "Solo cuentas autorizadas pueden ingresar." }
                </p>
            </div>
        </div>
    }
}

// ---- dashboard ----------------------------------------------------------

#[function_component(DashboardPage)]
pub fn dashboard_page() -> Html {
    let ctx = use_app_context();
    let navigator = use_navigator();
    let transactions = use_transactions();
    let tx_store = use_transaction_store();

    // Mirror the hook's collection into the shared replica.
    {
        let tx_store = tx_store.clone();
        use_effect_with_deps(
            move |(rows, loading): &(Vec<Transaction>, bool)| {
                tx_store.dispatch(TransactionStoreAction::Set(rows.clone()));
                tx_store.dispatch(TransactionStoreAction::SetLoading(*loading));
                || ()
            },
            (transactions.transactions().to_vec(), transactions.loading()),
        );
    }

    let stats = tx_store.stats();
    let recent = tx_store.recent(5);
    let name = ctx
        .session
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();

    let go_finance = Callback::from(move |_: MouseEvent| {
        if let Some(navigator) = navigator.clone() {
            navigator.push(&Route::Finance);
        }
    });

    html! {
        <div class="mx-auto max-w-4xl space-y-6 p-4 sm:p-6">
            <div class="rounded-2xl border bg-card p-6">
                <h1 class="text-2xl font-bold">{ format!("Hola, {name}") }</h1>
                <p class="mt-1 text-sm text-muted-foreground">
                    { "Este es el resumen de tus finanzas." }
                </p>
            </div>

            <SummaryCards {stats} />

            <div class="rounded-2xl border bg-card p-6">
                <div class="flex items-center justify-between">
                    <h2 class="text-lg font-semibold">{ "Movimientos recientes" }</h2>
                    <button class="text-sm font-medium text-primary" onclick={go_finance}>
                        { "Ver todo" }
                    </button>
                </div>
                if tx_store.loading {
                    <p class="py-8 text-center text-sm text-muted-foreground">{ "Cargando..." }</p>
                } else if recent.is_empty() {
                    <p class="py-8 text-center text-sm text-muted-foreground">
                        { "Aún no hay transacciones" }
                    </p>
                } else {
                    <ul class="mt-4 divide-y">
                        { for recent.iter().map(|t| {
                            let is_income = t.kind == TransactionKind::Income;
                            html! {
                                <li class="flex items-center justify-between py-2.5">
                                    <div class="min-w-0">
                                        <p class="truncate text-sm font-medium">{ &t.description }</p>
                                        <p class="text-xs text-muted-foreground">
                                            { format!("{} · {}", t.category, model::format_date(t.date)) }
                                        </p>
                                    </div>
                                    <span class={classes!(
                                        "text-sm", "font-semibold",
                                        if is_income { "text-green-600" } else { "text-red-600" },
                                    )}>
                                        { format!("{}S/ {}", if is_income { "+" } else { "-" }, model::format_amount(t.amount)) }
                                    </span>
                                </li>
                            }
                        }) }
                    </ul>
                }
            </div>
        </div>
    }
}

// ---- finance ------------------------------------------------------------

#[function_component(FinancePage)]
pub fn finance_page() -> Html {
    let ui = use_ui();
    let entity_store = use_entity_store();
    let tx_store = use_transaction_store();

    let entities = use_entities();
    let categories = use_categories();
    let transactions = use_transactions();

    let editing = use_state(|| Option::<Transaction>::None);

    {
        let entity_store = entity_store.clone();
        use_effect_with_deps(
            move |(rows, loading, error): &(Vec<Entity>, bool, Option<String>)| {
                entity_store.dispatch(EntityStoreAction::Set(rows.clone()));
                entity_store.dispatch(EntityStoreAction::SetLoading(*loading));
                entity_store.dispatch(EntityStoreAction::SetError(error.clone()));
                || ()
            },
            (
                entities.entities().to_vec(),
                entities.loading(),
                entities.error(),
            ),
        );
    }
    {
        let tx_store = tx_store.clone();
        use_effect_with_deps(
            move |(rows, loading, error): &(Vec<Transaction>, bool, Option<String>)| {
                tx_store.dispatch(TransactionStoreAction::Set(rows.clone()));
                tx_store.dispatch(TransactionStoreAction::SetLoading(*loading));
                tx_store.dispatch(TransactionStoreAction::SetError(error.clone()));
                || ()
            },
            (
                transactions.transactions().to_vec(),
                transactions.loading(),
                transactions.error(),
            ),
        );
    }

    let visible: Vec<Transaction> = {
        let by_entity = tx_store.by_entity(&ui.entity_filter);
        match ui.view_filter {
            ViewFilter::All => by_entity,
            ViewFilter::Income => model::filter_by_kind(&by_entity, TransactionKind::Income),
            ViewFilter::Expense => model::filter_by_kind(&by_entity, TransactionKind::Expense),
        }
    };

    let on_edit = {
        let editing = editing.clone();
        let ui = ui.clone();
        Callback::from(move |transaction: Transaction| {
            editing.set(Some(transaction));
            ui.dispatch(UiAction::ShowTransactionForm);
        })
    };

    let on_delete = {
        let transactions = transactions.clone();
        Callback::from(move |id: String| {
            let transactions = transactions.clone();
            spawn_local(async move {
                transactions.delete(&id).await;
            });
        })
    };

    let open_form = {
        let editing = editing.clone();
        let ui = ui.clone();
        Callback::from(move |_: MouseEvent| {
            editing.set(None);
            ui.dispatch(UiAction::ShowTransactionForm);
        })
    };

    let close_form = {
        let editing = editing.clone();
        let ui = ui.clone();
        Callback::from(move |_: ()| {
            editing.set(None);
            ui.dispatch(UiAction::HideTransactionForm);
        })
    };

    let view_tab = |view: View| {
        let ui = ui.clone();
        let active = ui.current_view == view;
        let onclick = Callback::from(move |_: MouseEvent| ui.dispatch(UiAction::SetView(view)));
        html! {
            <button
                class={classes!(
                    "flex", "items-center", "gap-2", "rounded-lg", "px-4", "py-2", "text-sm", "font-medium",
                    if active { "bg-primary text-primary-foreground" } else { "text-muted-foreground hover:bg-muted" },
                )}
                {onclick}
            >
                { if view == View::Transactions { icon_layout_grid() } else { icon_bar_chart() } }
                { view.label() }
            </button>
        }
    };

    let filter_tab = |filter: ViewFilter| {
        let ui = ui.clone();
        let active = ui.view_filter == filter;
        let onclick =
            Callback::from(move |_: MouseEvent| ui.dispatch(UiAction::SetViewFilter(filter)));
        html! {
            <button
                class={classes!(
                    "rounded-full", "px-3", "py-1", "text-sm",
                    if active { "bg-primary text-primary-foreground" } else { "bg-muted text-muted-foreground" },
                )}
                {onclick}
            >
                { filter.label() }
            </button>
        }
    };

    let on_entity_filter = {
        let ui = ui.clone();
        Callback::from(move |id: String| ui.dispatch(UiAction::SetEntityFilter(id)))
    };

    let open_entities = {
        let ui = ui.clone();
        Callback::from(move |_: MouseEvent| ui.dispatch(UiAction::ShowEntityManagement))
    };
    let open_categories = {
        let ui = ui.clone();
        Callback::from(move |_: MouseEvent| ui.dispatch(UiAction::ShowCategoryManagement))
    };

    html! {
        <div class="mx-auto max-w-5xl space-y-6 p-4 sm:p-6">
            <div class="flex flex-wrap items-center justify-between gap-3">
                <div class="flex gap-2">
                    { view_tab(View::Transactions) }
                    { view_tab(View::Reports) }
                </div>
                <div class="flex gap-2">
                    <button class="flex items-center gap-2 rounded-lg border px-3 py-2 text-sm hover:bg-muted" onclick={open_entities}>
                        { icon_settings() }{ "Entidades" }
                    </button>
                    <button class="flex items-center gap-2 rounded-lg border px-3 py-2 text-sm hover:bg-muted" onclick={open_categories}>
                        { icon_settings() }{ "Categorías" }
                    </button>
                </div>
            </div>

            if ui.current_view == View::Transactions {
                <SummaryCards stats={tx_store.stats()} />

                <div class="flex flex-wrap items-center justify-between gap-3">
                    <div class="flex gap-2">
                        { filter_tab(ViewFilter::All) }
                        { filter_tab(ViewFilter::Income) }
                        { filter_tab(ViewFilter::Expense) }
                    </div>
                    <div class="w-full sm:w-64">
                        <EntitySearchBox
                            entities={entity_store.entities.clone()}
                            value={ui.entity_filter.clone()}
                            on_select={on_entity_filter}
                        />
                    </div>
                </div>

                <div class="rounded-2xl border bg-card p-4 sm:p-6">
                    <TransactionList
                        transactions={visible}
                        loading={tx_store.loading}
                        {on_edit}
                        {on_delete}
                    />
                </div>
            } else {
                <ReportView transactions={transactions.clone()} entities={entity_store.entities.clone()} />
            }

            <button
                class="fixed bottom-6 right-6 flex h-14 w-14 items-center justify-center rounded-full bg-primary text-primary-foreground shadow-lg"
                onclick={open_form}
                aria-label="Nueva transacción"
            >
                { icon_plus() }
            </button>

            if ui.transaction_form_visible {
                <TransactionForm
                    entities={entities.clone()}
                    categories={categories.clone()}
                    transactions={transactions.clone()}
                    editing={(*editing).clone()}
                    on_close={close_form}
                />
            }
            if ui.entity_management_visible {
                <EntityManagement
                    entities={entities.clone()}
                    on_close={{
                        let ui = ui.clone();
                        Callback::from(move |_: ()| ui.dispatch(UiAction::HideEntityManagement))
                    }}
                />
            }
            if ui.category_management_visible {
                <CategoryManagement
                    categories={categories.clone()}
                    on_close={{
                        let ui = ui.clone();
                        Callback::from(move |_: ()| ui.dispatch(UiAction::HideCategoryManagement))
                    }}
                />
            }
        </div>
    }
}

// ---- transaction form ---------------------------------------------------

#[derive(Properties, PartialEq)]
struct TransactionFormProps {
    entities: UseEntitiesHandle,
    categories: UseCategoriesHandle,
    transactions: UseTransactionsHandle,
    editing: Option<Transaction>,
    on_close: Callback<()>,
}

#[function_component(TransactionForm)]
fn transaction_form(props: &TransactionFormProps) -> Html {
    let kind = use_state(|| {
        props
            .editing
            .as_ref()
            .map(|t| t.kind)
            .unwrap_or(TransactionKind::Income)
    });
    let amount = use_state(|| {
        props
            .editing
            .as_ref()
            .map(|t| t.amount.to_string())
            .unwrap_or_default()
    });
    let description = use_state(|| {
        props
            .editing
            .as_ref()
            .map(|t| t.description.clone())
            .unwrap_or_default()
    });
    let date = use_state(|| {
        props
            .editing
            .as_ref()
            .map(|t| t.date)
            .unwrap_or_else(|| chrono::Local::now().date_naive())
    });
    let entity = use_state(|| {
        props.editing.as_ref().and_then(|t| {
            t.entity.clone().or_else(|| {
                props
                    .entities
                    .entities()
                    .iter()
                    .find(|e| e.id == t.entity_id)
                    .cloned()
            })
        })
    });
    let category = use_state(|| {
        props
            .editing
            .as_ref()
            .map(|t| t.category.clone())
            .unwrap_or_default()
    });
    let saving = use_state(|| false);

    let ctx = use_app_context();

    let pick_kind = |target: TransactionKind| {
        let kind = kind.clone();
        let category = category.clone();
        Callback::from(move |_: MouseEvent| {
            if *kind != target {
                kind.set(target);
                // The category list is kind-scoped; a stale pick is invalid.
                category.set(String::new());
            }
        })
    };

    let on_amount = {
        let amount = amount.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            amount.set(input.value());
        })
    };
    let on_description = {
        let description = description.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            description.set(input.value());
        })
    };
    let on_date = {
        let date = date.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            if let Ok(parsed) = NaiveDate::parse_from_str(&input.value(), "%Y-%m-%d") {
                date.set(parsed);
            }
        })
    };
    let on_entity = {
        let entity = entity.clone();
        Callback::from(move |picked: Entity| entity.set(Some(picked)))
    };
    let on_category = {
        let category = category.clone();
        Callback::from(move |picked: String| category.set(picked))
    };

    let onsubmit = {
        let kind = kind.clone();
        let amount = amount.clone();
        let description = description.clone();
        let date = date.clone();
        let entity = entity.clone();
        let category = category.clone();
        let saving = saving.clone();
        let transactions = props.transactions.clone();
        let editing_id = props.editing.as_ref().map(|t| t.id.clone());
        let on_close = props.on_close.clone();
        let toaster = ctx.toaster.clone();
        Callback::from(move |e: SubmitEvent| {
            e.prevent_default();

            let parsed_amount = amount.trim().parse::<f64>().ok();
            let entity_id = entity.as_ref().map(|en| en.id.clone());
            let (Some(parsed_amount), Some(entity_id)) = (parsed_amount, entity_id) else {
                toaster.error("Por favor completa todos los campos");
                return;
            };
            if parsed_amount <= 0.0 || description.trim().is_empty() || category.is_empty() {
                toaster.error("Por favor completa todos los campos");
                return;
            }

            let transactions = transactions.clone();
            let on_close = on_close.clone();
            let saving = saving.clone();
            let editing_id = editing_id.clone();
            let kind_now = *kind;
            let category_now = (*category).clone();
            let description_now = description.trim().to_string();
            let date_now = *date;

            saving.set(true);
            spawn_local(async move {
                let ok = match editing_id {
                    Some(id) => {
                        let patch = TransactionPatch {
                            kind: Some(kind_now),
                            category: Some(category_now),
                            amount: Some(parsed_amount),
                            description: Some(description_now),
                            date: Some(date_now),
                            entity_id: Some(entity_id),
                        };
                        transactions.update(&id, patch).await
                    }
                    None => {
                        let input = TransactionInput {
                            kind: kind_now,
                            category: category_now,
                            amount: parsed_amount,
                            description: description_now,
                            date: date_now,
                            entity_id,
                        };
                        transactions.create(input).await
                    }
                };
                saving.set(false);
                if ok {
                    on_close.emit(());
                }
            });
        })
    };

    let title = if props.editing.is_some() {
        "Editar Transacción"
    } else {
        "Nueva Transacción"
    };

    let kind_button = |target: TransactionKind, label: &'static str, active_class: &'static str| {
        let active = *kind == target;
        html! {
            <button
                type="button"
                class={classes!(
                    "flex-1", "rounded-lg", "px-4", "py-2", "text-sm", "font-medium", "border",
                    if active { active_class } else { "text-muted-foreground" },
                )}
                onclick={pick_kind(target)}
            >
                { label }
            </button>
        }
    };

    html! {
        <Modal title={title.to_string()} on_close={props.on_close.clone()}>
            <form class="space-y-4" {onsubmit}>
                <div class="flex gap-2">
                    { kind_button(TransactionKind::Income, "Ingreso", "bg-green-100 text-green-700 border-green-300") }
                    { kind_button(TransactionKind::Expense, "Gasto", "bg-red-100 text-red-700 border-red-300") }
                </div>

                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Monto (S/)" }</label>
                    <input
                        type="number"
                        step="0.01"
                        min="0"
                        class="w-full rounded-lg border bg-background px-3 py-2 text-sm"
                        value={(*amount).clone()}
                        oninput={on_amount}
                    />
                </div>

                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Descripción" }</label>
                    <input
                        type="text"
                        class="w-full rounded-lg border bg-background px-3 py-2 text-sm"
                        value={(*description).clone()}
                        oninput={on_description}
                    />
                </div>

                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Fecha" }</label>
                    <input
                        type="date"
                        class="w-full rounded-lg border bg-background px-3 py-2 text-sm"
                        value={date.format("%Y-%m-%d").to_string()}
                        oninput={on_date}
                    />
                </div>

                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Entidad" }</label>
                    <EntityComboBox
                        entities={props.entities.clone()}
                        value={(*entity).clone()}
                        on_select={on_entity}
                    />
                </div>

                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Categoría" }</label>
                    <CategoryComboBox
                        kind={*kind}
                        categories={props.categories.clone()}
                        value={(*category).clone()}
                        on_select={on_category}
                    />
                </div>

                <button
                    type="submit"
                    class="w-full rounded-lg bg-primary px-4 py-2.5 text-sm font-medium text-primary-foreground disabled:opacity-50"
                    disabled={*saving}
                >
                    { if *saving { "Guardando..." } else { "Guardar" } }
                </button>
            </form>
        </Modal>
    }
}

// ---- entity management --------------------------------------------------

#[derive(Properties, PartialEq)]
struct EntityManagementProps {
    entities: UseEntitiesHandle,
    on_close: Callback<()>,
}

#[function_component(EntityManagement)]
fn entity_management(props: &EntityManagementProps) -> Html {
    let editing = use_state(|| Option::<(String, String)>::None);

    let rows = props.entities.entities().to_vec();

    let save = {
        let entities = props.entities.clone();
        let editing = editing.clone();
        Callback::from(move |_: MouseEvent| {
            let Some((id, draft)) = (*editing).clone() else {
                return;
            };
            if draft.trim().is_empty() {
                return;
            }
            let entities = entities.clone();
            let editing = editing.clone();
            spawn_local(async move {
                if entities.rename(&id, &draft).await {
                    editing.set(None);
                }
            });
        })
    };

    html! {
        <Modal title={"Entidades".to_string()} on_close={props.on_close.clone()}>
            if rows.is_empty() {
                <p class="py-6 text-center text-sm text-muted-foreground">
                    { "Aún no hay entidades registradas" }
                </p>
            } else {
                <ul class="divide-y">
                    { for rows.iter().map(|entity| {
                        let is_editing = editing
                            .as_ref()
                            .is_some_and(|(id, _)| id == &entity.id);
                        if is_editing {
                            let draft = editing
                                .as_ref()
                                .map(|(_, d)| d.clone())
                                .unwrap_or_default();
                            let on_draft = {
                                let editing = editing.clone();
                                let id = entity.id.clone();
                                Callback::from(move |e: InputEvent| {
                                    let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                                    editing.set(Some((id.clone(), input.value())));
                                })
                            };
                            let cancel = {
                                let editing = editing.clone();
                                Callback::from(move |_: MouseEvent| editing.set(None))
                            };
                            html! {
                                <li class="flex items-center gap-2 py-2.5">
                                    <input
                                        type="text"
                                        class="flex-1 rounded-lg border bg-background px-3 py-1.5 text-sm"
                                        value={draft}
                                        oninput={on_draft}
                                    />
                                    <button class="text-sm font-medium text-primary" onclick={save.clone()}>{ "Guardar" }</button>
                                    <button class="text-sm text-muted-foreground" onclick={cancel}>{ "Cancelar" }</button>
                                </li>
                            }
                        } else {
                            let start_edit = {
                                let editing = editing.clone();
                                let id = entity.id.clone();
                                let name = entity.name.clone();
                                Callback::from(move |_: MouseEvent| {
                                    editing.set(Some((id.clone(), name.clone())));
                                })
                            };
                            let delete = {
                                let entities = props.entities.clone();
                                let id = entity.id.clone();
                                Callback::from(move |_: MouseEvent| {
                                    let confirmed = web_sys::window()
                                        .and_then(|w| {
                                            w.confirm_with_message("¿Estás seguro de eliminar esta entidad?").ok()
                                        })
                                        .unwrap_or(false);
                                    if !confirmed {
                                        return;
                                    }
                                    let entities = entities.clone();
                                    let id = id.clone();
                                    spawn_local(async move {
                                        entities.delete(&id).await;
                                    });
                                })
                            };
                            html! {
                                <li class="flex items-center justify-between py-2.5">
                                    <span class="text-sm">{ &entity.name }</span>
                                    <div class="flex items-center gap-2">
                                        <button class="text-muted-foreground hover:text-foreground" onclick={start_edit} aria-label="Editar">
                                            { icon_pencil() }
                                        </button>
                                        <button class="text-muted-foreground hover:text-red-600" onclick={delete} aria-label="Eliminar">
                                            { icon_trash() }
                                        </button>
                                    </div>
                                </li>
                            }
                        }
                    }) }
                </ul>
            }
        </Modal>
    }
}

// ---- category management ------------------------------------------------

#[derive(Properties, PartialEq)]
struct CategoryManagementProps {
    categories: UseCategoriesHandle,
    on_close: Callback<()>,
}

#[function_component(CategoryManagement)]
fn category_management(props: &CategoryManagementProps) -> Html {
    let kind = use_state(|| TransactionKind::Income);
    let rows = use_state(|| Option::<Vec<CategoryRow>>::None);
    let editing = use_state(|| Option::<(String, String)>::None);
    let reload = use_state(|| 0u32);

    {
        let categories = props.categories.clone();
        let rows = rows.clone();
        use_effect_with_deps(
            move |(kind, _): &(TransactionKind, u32)| {
                let kind = *kind;
                rows.set(None);
                let rows = rows.clone();
                spawn_local(async move {
                    rows.set(Some(categories.rows_by_kind(kind).await.unwrap_or_default()));
                });
                || ()
            },
            (*kind, *reload),
        );
    }

    let kind_tab = |target: TransactionKind| {
        let kind = kind.clone();
        let editing = editing.clone();
        let active = *kind == target;
        let onclick = Callback::from(move |_: MouseEvent| {
            kind.set(target);
            editing.set(None);
        });
        html! {
            <button
                class={classes!(
                    "flex-1", "rounded-lg", "px-4", "py-2", "text-sm", "font-medium", "border",
                    if active { "bg-primary text-primary-foreground" } else { "text-muted-foreground" },
                )}
                {onclick}
            >
                { target.label() }
            </button>
        }
    };

    let save = {
        let categories = props.categories.clone();
        let editing = editing.clone();
        let reload = reload.clone();
        Callback::from(move |_: MouseEvent| {
            let Some((id, draft)) = (*editing).clone() else {
                return;
            };
            if draft.trim().is_empty() {
                return;
            }
            let categories = categories.clone();
            let editing = editing.clone();
            let reload = reload.clone();
            spawn_local(async move {
                if categories.rename(&id, &draft).await {
                    editing.set(None);
                    reload.set(reload.wrapping_add(1));
                }
            });
        })
    };

    html! {
        <Modal title={"Categorías".to_string()} on_close={props.on_close.clone()}>
            <div class="mb-4 flex gap-2">
                { kind_tab(TransactionKind::Income) }
                { kind_tab(TransactionKind::Expense) }
            </div>

            { match rows.as_ref() {
                None => html! {
                    <p class="py-6 text-center text-sm text-muted-foreground">{ "Cargando..." }</p>
                },
                Some(list) if list.is_empty() => html! {
                    <p class="py-6 text-center text-sm text-muted-foreground">{ "Sin categorías" }</p>
                },
                Some(list) => html! {
                    <ul class="divide-y">
                        { for list.iter().map(|row| {
                            let is_editing = editing
                                .as_ref()
                                .is_some_and(|(id, _)| id == &row.id);
                            if row.is_default {
                                html! {
                                    <li class="flex items-center justify-between py-2.5">
                                        <span class="text-sm">{ &row.name }</span>
                                        <span class="rounded-full bg-muted px-2 py-0.5 text-xs text-muted-foreground">
                                            { "Por defecto" }
                                        </span>
                                    </li>
                                }
                            } else if is_editing {
                                let draft = editing
                                    .as_ref()
                                    .map(|(_, d)| d.clone())
                                    .unwrap_or_default();
                                let on_draft = {
                                    let editing = editing.clone();
                                    let id = row.id.clone();
                                    Callback::from(move |e: InputEvent| {
                                        let input: web_sys::HtmlInputElement = e.target_unchecked_into();
                                        editing.set(Some((id.clone(), input.value())));
                                    })
                                };
                                let cancel = {
                                    let editing = editing.clone();
                                    Callback::from(move |_: MouseEvent| editing.set(None))
                                };
                                html! {
                                    <li class="flex items-center gap-2 py-2.5">
                                        <input
                                            type="text"
                                            class="flex-1 rounded-lg border bg-background px-3 py-1.5 text-sm"
                                            value={draft}
                                            oninput={on_draft}
                                        />
                                        <button class="text-sm font-medium text-primary" onclick={save.clone()}>{ "Guardar" }</button>
                                        <button class="text-sm text-muted-foreground" onclick={cancel}>{ "Cancelar" }</button>
                                    </li>
                                }
                            } else {
                                let start_edit = {
                                    let editing = editing.clone();
                                    let id = row.id.clone();
                                    let name = row.name.clone();
                                    Callback::from(move |_: MouseEvent| {
                                        editing.set(Some((id.clone(), name.clone())));
                                    })
                                };
                                let delete = {
                                    let categories = props.categories.clone();
                                    let reload = reload.clone();
                                    let name = row.name.clone();
                                    let kind = row.kind;
                                    Callback::from(move |_: MouseEvent| {
                                        let confirmed = web_sys::window()
                                            .and_then(|w| {
                                                w.confirm_with_message("¿Estás seguro de eliminar esta categoría?").ok()
                                            })
                                            .unwrap_or(false);
                                        if !confirmed {
                                            return;
                                        }
                                        let categories = categories.clone();
                                        let reload = reload.clone();
                                        let name = name.clone();
                                        spawn_local(async move {
                                            if categories.delete(&name, kind).await {
                                                reload.set(reload.wrapping_add(1));
                                            }
                                        });
                                    })
                                };
                                html! {
                                    <li class="flex items-center justify-between py-2.5">
                                        <span class="text-sm">{ &row.name }</span>
                                        <div class="flex items-center gap-2">
                                            <button class="text-muted-foreground hover:text-foreground" onclick={start_edit} aria-label="Editar">
                                                { icon_pencil() }
                                            </button>
                                            <button class="text-muted-foreground hover:text-red-600" onclick={delete} aria-label="Eliminar">
                                                { icon_trash() }
                                            </button>
                                        </div>
                                    </li>
                                }
                            }
                        }) }
                    </ul>
                },
            } }
        </Modal>
    }
}

// ---- reports ------------------------------------------------------------

#[derive(Properties, PartialEq)]
struct ReportViewProps {
    transactions: UseTransactionsHandle,
    entities: Vec<Entity>,
}

#[function_component(ReportView)]
fn report_view(props: &ReportViewProps) -> Html {
    let entity_filter = use_state(|| ALL_ENTITIES.to_string());
    let start = use_state(|| Option::<NaiveDate>::None);
    let end = use_state(|| Option::<NaiveDate>::None);

    let mut filtered = model::filter_by_entity(props.transactions.transactions(), &entity_filter);
    if let (Some(start), Some(end)) = (*start, *end) {
        filtered = model::filter_by_date_range(&filtered, start, end);
    }

    let stats = model::stats(&filtered);
    let count = filtered.len();
    let total_moved = stats.total_income + stats.total_expenses;
    let average = if count > 0 {
        total_moved / count as f64
    } else {
        0.0
    };
    let largest = filtered.iter().map(|t| t.amount).fold(0.0_f64, f64::max);

    let incomes = model::filter_by_kind(&filtered, TransactionKind::Income);
    let expenses = model::filter_by_kind(&filtered, TransactionKind::Expense);

    let on_entity = {
        let entity_filter = entity_filter.clone();
        Callback::from(move |id: String| entity_filter.set(id))
    };
    let on_start = {
        let start = start.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            start.set(NaiveDate::parse_from_str(&input.value(), "%Y-%m-%d").ok());
        })
    };
    let on_end = {
        let end = end.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            end.set(NaiveDate::parse_from_str(&input.value(), "%Y-%m-%d").ok());
        })
    };

    let detail_column = |title: &'static str, rows: &[Transaction], income: bool| {
        html! {
            <div class="rounded-2xl border bg-card p-4">
                <h3 class="mb-3 text-sm font-semibold">{ title }</h3>
                if rows.is_empty() {
                    <p class="py-4 text-center text-sm text-muted-foreground">{ "Sin movimientos" }</p>
                } else {
                    <ul class="divide-y">
                        { for rows.iter().map(|t| html! {
                            <li class="flex items-center justify-between py-2">
                                <div class="min-w-0">
                                    <p class="truncate text-sm">{ &t.description }</p>
                                    <p class="text-xs text-muted-foreground">
                                        { format!("{} · {}", t.category, model::format_date(t.date)) }
                                    </p>
                                </div>
                                <span class={classes!(
                                    "text-sm", "font-medium",
                                    if income { "text-green-600" } else { "text-red-600" },
                                )}>
                                    { format!("S/ {}", model::format_amount(t.amount)) }
                                </span>
                            </li>
                        }) }
                    </ul>
                }
            </div>
        }
    };

    html! {
        <div class="space-y-6">
            <div class="flex flex-wrap items-end gap-3">
                <div class="w-full sm:w-64">
                    <label class="mb-1 block text-sm font-medium">{ "Entidad" }</label>
                    <EntitySearchBox
                        entities={props.entities.clone()}
                        value={(*entity_filter).clone()}
                        on_select={on_entity}
                    />
                </div>
                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Desde" }</label>
                    <input type="date" class="rounded-lg border bg-background px-3 py-2 text-sm" oninput={on_start} />
                </div>
                <div>
                    <label class="mb-1 block text-sm font-medium">{ "Hasta" }</label>
                    <input type="date" class="rounded-lg border bg-background px-3 py-2 text-sm" oninput={on_end} />
                </div>
            </div>

            <SummaryCards {stats} />

            <div class="grid grid-cols-1 gap-4 sm:grid-cols-3">
                <div class="rounded-xl border bg-card p-4">
                    <p class="text-sm text-muted-foreground">{ "Transacciones" }</p>
                    <p class="mt-2 text-2xl font-bold">{ count }</p>
                </div>
                <div class="rounded-xl border bg-card p-4">
                    <p class="text-sm text-muted-foreground">{ "Promedio por movimiento" }</p>
                    <p class="mt-2 text-2xl font-bold">{ format!("S/ {}", model::format_amount(average)) }</p>
                </div>
                <div class="rounded-xl border bg-card p-4">
                    <p class="text-sm text-muted-foreground">{ "Mayor movimiento" }</p>
                    <p class="mt-2 text-2xl font-bold">{ format!("S/ {}", model::format_amount(largest)) }</p>
                </div>
            </div>

            <div class="grid grid-cols-1 gap-4 lg:grid-cols-2">
                { detail_column("Detalle de Ingresos", &incomes, true) }
                { detail_column("Detalle de Egresos", &expenses, false) }
            </div>
        </div>
    }
}
