use gloo_events::EventListener;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::hooks::{UseCategoriesHandle, UseEntitiesHandle};
use crate::model::{
    self, Entity, Stats, Transaction, TransactionKind, ALL_ENTITIES, ALL_ENTITIES_LABEL,
};

// ---- modal --------------------------------------------------------------

#[derive(Properties, PartialEq)]
pub struct ModalProps {
    pub title: String,
    pub on_close: Callback<()>,
    pub children: Children,
}

/// Centered dialog. Clicking the backdrop or the close button closes it;
/// clicks inside the panel do not propagate out.
#[function_component(Modal)]
pub fn modal(props: &ModalProps) -> Html {
    let on_backdrop = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };
    let on_panel = Callback::from(|e: MouseEvent| e.stop_propagation());
    let on_button = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };

    html! {
        <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/50 p-4" onclick={on_backdrop}>
            <div class="bg-card text-foreground rounded-xl shadow-xl w-full max-w-lg max-h-[90vh] overflow-y-auto" onclick={on_panel}>
                <div class="flex items-center justify-between border-b px-6 py-4">
                    <h2 class="text-lg font-semibold">{ &props.title }</h2>
                    <button class="text-muted-foreground hover:text-foreground" onclick={on_button} aria-label="Cerrar">
                        { icon_x() }
                    </button>
                </div>
                <div class="px-6 py-4">
                    { for props.children.iter() }
                </div>
            </div>
        </div>
    }
}

// ---- creatable combo boxes ----------------------------------------------

/// Registers a document-level mousedown listener while `open` is true and
/// closes the dropdown when the press lands outside `container`.
#[hook]
fn use_close_on_outside_click(container: NodeRef, open: UseStateHandle<bool>) {
    let is_open = *open;
    use_effect_with_deps(
        move |is_open| {
            let listener = if *is_open {
                web_sys::window()
                    .and_then(|w| w.document())
                    .map(|document| {
                        EventListener::new(&document, "mousedown", move |event| {
                            let outside = match (
                                container.cast::<web_sys::Node>(),
                                event
                                    .target()
                                    .and_then(|t| t.dyn_into::<web_sys::Node>().ok()),
                            ) {
                                (Some(root), Some(target)) => !root.contains(Some(&target)),
                                _ => false,
                            };
                            if outside {
                                open.set(false);
                            }
                        })
                    })
            } else {
                None
            };
            move || drop(listener)
        },
        is_open,
    );
}

#[derive(Properties, PartialEq)]
pub struct EntityComboBoxProps {
    pub entities: UseEntitiesHandle,
    pub value: Option<Entity>,
    pub on_select: Callback<Entity>,
}

/// Searchable entity picker with inline creation. Enter selects the sole
/// match or creates the typed name; Escape closes and clears the search.
#[function_component(EntityComboBox)]
pub fn entity_combo_box(props: &EntityComboBoxProps) -> Html {
    let container = use_node_ref();
    let open = use_state(|| false);
    let search = use_state(String::new);
    let creating = use_state(|| false);

    use_close_on_outside_click(container.clone(), open.clone());

    let names: Vec<String> = props
        .entities
        .entities()
        .iter()
        .map(|e| e.name.clone())
        .collect();
    let filtered = model::filter_candidates(&names, &search);
    let can_create = model::show_create_option(&names, &search);

    let select_by_name = {
        let entities = props.entities.clone();
        let on_select = props.on_select.clone();
        let open = open.clone();
        let search = search.clone();
        Callback::from(move |name: String| {
            if let Some(entity) = model::find_entity_by_name(entities.entities(), &name) {
                on_select.emit(entity.clone());
            }
            open.set(false);
            search.set(String::new());
        })
    };

    let create = {
        let entities = props.entities.clone();
        let on_select = props.on_select.clone();
        let open = open.clone();
        let search = search.clone();
        let creating = creating.clone();
        Callback::from(move |name: String| {
            let entities = entities.clone();
            let on_select = on_select.clone();
            let open = open.clone();
            let search = search.clone();
            let creating = creating.clone();
            creating.set(true);
            spawn_local(async move {
                if let Some(entity) = entities.find_or_create(&name).await {
                    on_select.emit(entity);
                    open.set(false);
                    search.set(String::new());
                }
                creating.set(false);
            });
        })
    };

    let on_input = {
        let search = search.clone();
        let open = open.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            search.set(input.value());
            open.set(true);
        })
    };

    let on_focus = {
        let open = open.clone();
        Callback::from(move |_: FocusEvent| open.set(true))
    };

    let on_keydown = {
        let filtered = filtered.clone();
        let search = search.clone();
        let open = open.clone();
        let creating = creating.clone();
        let select_by_name = select_by_name.clone();
        let create = create.clone();
        Callback::from(move |e: KeyboardEvent| match e.key().as_str() {
            "Enter" => {
                e.prevent_default();
                match model::enter_action(&filtered, &search, *creating) {
                    model::EnterAction::Create(name) => create.emit(name),
                    model::EnterAction::Select(name) => select_by_name.emit(name),
                    model::EnterAction::Ignore => {}
                }
            }
            "Escape" => {
                open.set(false);
                search.set(String::new());
            }
            _ => {}
        })
    };

    let placeholder = props
        .value
        .as_ref()
        .map(|e| e.name.clone())
        .unwrap_or_else(|| "Buscar o crear entidad...".to_string());

    html! {
        <div class="relative" ref={container}>
            <input
                type="text"
                class="w-full rounded-lg border bg-background px-3 py-2 text-sm focus:outline-none focus:ring-2 focus:ring-primary"
                value={(*search).clone()}
                {placeholder}
                oninput={on_input}
                onfocus={on_focus}
                onkeydown={on_keydown}
                disabled={*creating}
            />
            if *open {
                <ul class="absolute z-20 mt-1 w-full max-h-56 overflow-y-auto rounded-lg border bg-card shadow-lg">
                    { for filtered.iter().map(|name| {
                        let select_by_name = select_by_name.clone();
                        let name = name.clone();
                        let label = name.clone();
                        html! {
                            <li>
                                <button
                                    type="button"
                                    class="w-full px-3 py-2 text-left text-sm hover:bg-muted"
                                    onclick={Callback::from(move |_| select_by_name.emit(name.clone()))}
                                >
                                    { label }
                                </button>
                            </li>
                        }
                    }) }
                    if can_create {
                        <li>
                            <button
                                type="button"
                                class="w-full px-3 py-2 text-left text-sm text-primary hover:bg-muted"
                                disabled={*creating}
                                onclick={{
                                    let create = create.clone();
                                    let name = search.trim().to_string();
                                    Callback::from(move |_| create.emit(name.clone()))
                                }}
                            >
                                { if *creating { "Creando...".to_string() } else { format!("Crear \"{}\"", search.trim()) } }
                            </button>
                        </li>
                    }
                    if filtered.is_empty() && !can_create {
                        <li class="px-3 py-2 text-sm text-muted-foreground">{ "Sin resultados" }</li>
                    }
                </ul>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct CategoryComboBoxProps {
    pub kind: TransactionKind,
    pub categories: UseCategoriesHandle,
    pub value: String,
    pub on_select: Callback<String>,
}

/// Category picker scoped to a transaction kind. Candidates are the fixed
/// defaults for the kind unioned with the stored custom names; typing a new
/// name offers creation.
#[function_component(CategoryComboBox)]
pub fn category_combo_box(props: &CategoryComboBoxProps) -> Html {
    let container = use_node_ref();
    let open = use_state(|| false);
    let search = use_state(String::new);
    let creating = use_state(|| false);
    let custom = use_state(Vec::<String>::new);

    use_close_on_outside_click(container.clone(), open.clone());

    {
        let categories = props.categories.clone();
        let custom = custom.clone();
        use_effect_with_deps(
            move |kind| {
                let kind = *kind;
                spawn_local(async move {
                    custom.set(categories.names_by_kind(kind).await);
                });
                || ()
            },
            props.kind,
        );
    }

    let candidates = model::combo_candidates(model::default_categories(props.kind), &custom);
    let filtered = model::filter_candidates(&candidates, &search);
    let can_create = model::show_create_option(&candidates, &search);

    let select = {
        let on_select = props.on_select.clone();
        let open = open.clone();
        let search = search.clone();
        Callback::from(move |name: String| {
            on_select.emit(name);
            open.set(false);
            search.set(String::new());
        })
    };

    let create = {
        let categories = props.categories.clone();
        let kind = props.kind;
        let custom = custom.clone();
        let select = select.clone();
        let creating = creating.clone();
        Callback::from(move |name: String| {
            let categories = categories.clone();
            let custom = custom.clone();
            let select = select.clone();
            let creating = creating.clone();
            creating.set(true);
            spawn_local(async move {
                if let Some(created) = categories.find_or_create(&name, kind).await {
                    custom.set(categories.names_by_kind(kind).await);
                    select.emit(created);
                }
                creating.set(false);
            });
        })
    };

    let on_input = {
        let search = search.clone();
        let open = open.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            search.set(input.value());
            open.set(true);
        })
    };

    let on_focus = {
        let open = open.clone();
        Callback::from(move |_: FocusEvent| open.set(true))
    };

    let on_keydown = {
        let filtered = filtered.clone();
        let search = search.clone();
        let open = open.clone();
        let creating = creating.clone();
        let select = select.clone();
        let create = create.clone();
        Callback::from(move |e: KeyboardEvent| match e.key().as_str() {
            "Enter" => {
                e.prevent_default();
                match model::enter_action(&filtered, &search, *creating) {
                    model::EnterAction::Create(name) => create.emit(name),
                    model::EnterAction::Select(name) => select.emit(name),
                    model::EnterAction::Ignore => {}
                }
            }
            "Escape" => {
                open.set(false);
                search.set(String::new());
            }
            _ => {}
        })
    };

    let placeholder = if props.value.is_empty() {
        "Buscar o crear categoría...".to_string()
    } else {
        props.value.clone()
    };

    html! {
        <div class="relative" ref={container}>
            <input
                type="text"
                class="w-full rounded-lg border bg-background px-3 py-2 text-sm focus:outline-none focus:ring-2 focus:ring-primary"
                value={(*search).clone()}
                {placeholder}
                oninput={on_input}
                onfocus={on_focus}
                onkeydown={on_keydown}
                disabled={*creating}
            />
            if *open {
                <ul class="absolute z-20 mt-1 w-full max-h-56 overflow-y-auto rounded-lg border bg-card shadow-lg">
                    { for filtered.iter().map(|name| {
                        let select = select.clone();
                        let name = name.clone();
                        let label = name.clone();
                        html! {
                            <li>
                                <button
                                    type="button"
                                    class="w-full px-3 py-2 text-left text-sm hover:bg-muted"
                                    onclick={Callback::from(move |_| select.emit(name.clone()))}
                                >
                                    { label }
                                </button>
                            </li>
                        }
                    }) }
                    if can_create {
                        <li>
                            <button
                                type="button"
                                class="w-full px-3 py-2 text-left text-sm text-primary hover:bg-muted"
                                disabled={*creating}
                                onclick={{
                                    let create = create.clone();
                                    let name = search.trim().to_string();
                                    Callback::from(move |_| create.emit(name.clone()))
                                }}
                            >
                                { if *creating { "Creando...".to_string() } else { format!("Crear \"{}\"", search.trim()) } }
                            </button>
                        </li>
                    }
                    if filtered.is_empty() && !can_create {
                        <li class="px-3 py-2 text-sm text-muted-foreground">{ "Sin resultados" }</li>
                    }
                </ul>
            }
        </div>
    }
}

// ---- entity filter ------------------------------------------------------

#[derive(Properties, PartialEq)]
pub struct EntitySearchBoxProps {
    pub entities: Vec<Entity>,
    /// [`ALL_ENTITIES`] or an entity id.
    pub value: String,
    pub on_select: Callback<String>,
}

/// Filter picker: the fixed "all entities" option plus every entity,
/// narrowed by a search term. Never creates.
#[function_component(EntitySearchBox)]
pub fn entity_search_box(props: &EntitySearchBoxProps) -> Html {
    let container = use_node_ref();
    let open = use_state(|| false);
    let search = use_state(String::new);

    use_close_on_outside_click(container.clone(), open.clone());

    let needle = search.to_lowercase();
    let matches: Vec<&Entity> = props
        .entities
        .iter()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .collect();
    let show_all_option = needle.is_empty()
        || ALL_ENTITIES_LABEL.to_lowercase().contains(&needle);

    let current_label = if props.value == ALL_ENTITIES {
        ALL_ENTITIES_LABEL.to_string()
    } else {
        props
            .entities
            .iter()
            .find(|e| e.id == props.value)
            .map(|e| e.name.clone())
            .unwrap_or_else(|| ALL_ENTITIES_LABEL.to_string())
    };

    let pick = {
        let on_select = props.on_select.clone();
        let open = open.clone();
        let search = search.clone();
        Callback::from(move |id: String| {
            on_select.emit(id);
            open.set(false);
            search.set(String::new());
        })
    };

    let on_input = {
        let search = search.clone();
        let open = open.clone();
        Callback::from(move |e: InputEvent| {
            let input: web_sys::HtmlInputElement = e.target_unchecked_into();
            search.set(input.value());
            open.set(true);
        })
    };

    let on_focus = {
        let open = open.clone();
        Callback::from(move |_: FocusEvent| open.set(true))
    };

    let on_keydown = {
        let entities = props.entities.clone();
        let open = open.clone();
        let search = search.clone();
        let pick = pick.clone();
        Callback::from(move |e: KeyboardEvent| match e.key().as_str() {
            "Enter" => {
                e.prevent_default();
                if let Some(choice) = model::sole_filter_choice(&entities, &search) {
                    pick.emit(choice);
                }
            }
            "Escape" => {
                open.set(false);
                search.set(String::new());
            }
            _ => {}
        })
    };

    html! {
        <div class="relative" ref={container}>
            <input
                type="text"
                class="w-full rounded-lg border bg-background px-3 py-2 text-sm focus:outline-none focus:ring-2 focus:ring-primary"
                value={(*search).clone()}
                placeholder={current_label}
                oninput={on_input}
                onfocus={on_focus}
                onkeydown={on_keydown}
            />
            if *open {
                <ul class="absolute z-20 mt-1 w-full max-h-56 overflow-y-auto rounded-lg border bg-card shadow-lg">
                    if show_all_option {
                        <li>
                            <button
                                type="button"
                                class="w-full px-3 py-2 text-left text-sm font-medium hover:bg-muted"
                                onclick={{
                                    let pick = pick.clone();
                                    Callback::from(move |_| pick.emit(ALL_ENTITIES.to_string()))
                                }}
                            >
                                { ALL_ENTITIES_LABEL }
                            </button>
                        </li>
                    }
                    { for matches.iter().map(|entity| {
                        let pick = pick.clone();
                        let id = entity.id.clone();
                        html! {
                            <li>
                                <button
                                    type="button"
                                    class="w-full px-3 py-2 text-left text-sm hover:bg-muted"
                                    onclick={Callback::from(move |_| pick.emit(id.clone()))}
                                >
                                    { &entity.name }
                                </button>
                            </li>
                        }
                    }) }
                    if matches.is_empty() && !show_all_option {
                        <li class="px-3 py-2 text-sm text-muted-foreground">{ "Sin resultados" }</li>
                    }
                </ul>
            }
        </div>
    }
}

// ---- transaction list ---------------------------------------------------

#[derive(Properties, PartialEq)]
pub struct TransactionListProps {
    pub transactions: Vec<Transaction>,
    pub loading: bool,
    pub on_edit: Callback<Transaction>,
    pub on_delete: Callback<String>,
}

#[function_component(TransactionList)]
pub fn transaction_list(props: &TransactionListProps) -> Html {
    if props.loading {
        return html! {
            <div class="py-12 text-center text-muted-foreground">{ "Cargando transacciones..." }</div>
        };
    }
    if props.transactions.is_empty() {
        return html! {
            <div class="py-12 text-center text-muted-foreground">{ "No hay transacciones registradas" }</div>
        };
    }

    html! {
        <ul class="divide-y">
            { for props.transactions.iter().map(|t| {
                let is_income = t.kind == TransactionKind::Income;
                let entity_name = t
                    .entity
                    .as_ref()
                    .map(|e| e.name.clone())
                    .unwrap_or_else(|| "Sin entidad".to_string());
                let on_edit = {
                    let on_edit = props.on_edit.clone();
                    let transaction = t.clone();
                    Callback::from(move |_: MouseEvent| on_edit.emit(transaction.clone()))
                };
                let on_delete = {
                    let on_delete = props.on_delete.clone();
                    let id = t.id.clone();
                    Callback::from(move |_: MouseEvent| {
                        let confirmed = web_sys::window()
                            .and_then(|w| w.confirm_with_message("¿Estás seguro de eliminar esta transacción?").ok())
                            .unwrap_or(false);
                        if confirmed {
                            on_delete.emit(id.clone());
                        }
                    })
                };
                html! {
                    <li class="flex items-center justify-between gap-4 py-3">
                        <div class="flex items-center gap-3 min-w-0">
                            <span class={classes!(
                                "flex", "h-9", "w-9", "shrink-0", "items-center", "justify-center", "rounded-full",
                                if is_income { "bg-green-100 text-green-600" } else { "bg-red-100 text-red-600" },
                            )}>
                                { if is_income { icon_trending_up() } else { icon_trending_down() } }
                            </span>
                            <div class="min-w-0">
                                <p class="truncate text-sm font-medium">{ &t.description }</p>
                                <p class="truncate text-xs text-muted-foreground">
                                    { format!("{} · {} · {}", entity_name, t.category, model::format_date(t.date)) }
                                </p>
                            </div>
                        </div>
                        <div class="flex items-center gap-2">
                            <span class={classes!(
                                "text-sm", "font-semibold", "whitespace-nowrap",
                                if is_income { "text-green-600" } else { "text-red-600" },
                            )}>
                                { format!("{}S/ {}", if is_income { "+" } else { "-" }, model::format_amount(t.amount)) }
                            </span>
                            <button class="text-muted-foreground hover:text-foreground" onclick={on_edit} aria-label="Editar">
                                { icon_pencil() }
                            </button>
                            <button class="text-muted-foreground hover:text-red-600" onclick={on_delete} aria-label="Eliminar">
                                { icon_trash() }
                            </button>
                        </div>
                    </li>
                }
            }) }
        </ul>
    }
}

// ---- summary cards ------------------------------------------------------

#[derive(Properties, PartialEq)]
pub struct SummaryCardsProps {
    pub stats: Stats,
}

#[function_component(SummaryCards)]
pub fn summary_cards(props: &SummaryCardsProps) -> Html {
    let balance_class = if props.stats.balance >= 0.0 {
        "text-green-600"
    } else {
        "text-red-600"
    };
    html! {
        <div class="grid grid-cols-1 gap-4 sm:grid-cols-3">
            <div class="rounded-xl border bg-card p-4">
                <div class="flex items-center justify-between">
                    <p class="text-sm text-muted-foreground">{ "Ingresos" }</p>
                    { icon_trending_up() }
                </div>
                <p class="mt-2 text-2xl font-bold text-green-600">
                    { format!("S/ {}", model::format_amount(props.stats.total_income)) }
                </p>
            </div>
            <div class="rounded-xl border bg-card p-4">
                <div class="flex items-center justify-between">
                    <p class="text-sm text-muted-foreground">{ "Egresos" }</p>
                    { icon_trending_down() }
                </div>
                <p class="mt-2 text-2xl font-bold text-red-600">
                    { format!("S/ {}", model::format_amount(props.stats.total_expenses)) }
                </p>
            </div>
            <div class="rounded-xl border bg-card p-4">
                <div class="flex items-center justify-between">
                    <p class="text-sm text-muted-foreground">{ "Balance" }</p>
                    { icon_wallet() }
                </div>
                <p class={classes!("mt-2", "text-2xl", "font-bold", balance_class)}>
                    { format!("S/ {}", model::format_amount(props.stats.balance)) }
                </p>
            </div>
        </div>
    }
}

// ---- icons --------------------------------------------------------------

fn icon_base(path: &'static str) -> Html {
    html! {
        <svg width="20" height="20" viewBox="0 0 24 24" fill="none" stroke="currentColor" stroke-width="2" stroke-linecap="round" stroke-linejoin="round">
            <path d={path}></path>
        </svg>
    }
}

pub fn icon_x() -> Html {
    icon_base("M18 6L6 18M6 6l12 12")
}
pub fn icon_plus() -> Html {
    icon_base("M12 5v14M5 12h14")
}
pub fn icon_pencil() -> Html {
    icon_base("M17 3l4 4L7 21H3v-4L17 3z")
}
pub fn icon_trash() -> Html {
    icon_base("M3 6h18M8 6V4h8v2M19 6l-1 14H6L5 6M10 11v6M14 11v6")
}
pub fn icon_wallet() -> Html {
    icon_base("M3 7h18v10H3zM16 7V5H5v2")
}
pub fn icon_trending_up() -> Html {
    icon_base("M3 17l6-6 4 4 7-7")
}
pub fn icon_trending_down() -> Html {
    icon_base("M3 7l6 6 4-4 7 7")
}
pub fn icon_bar_chart() -> Html {
    icon_base("M4 20V10M10 20V4M16 20v-6M22 20H2")
}
pub fn icon_log_out() -> Html {
    icon_base("M9 21H5a2 2 0 01-2-2V5a2 2 0 012-2h4M16 17l5-5-5-5M21 12H9")
}
pub fn icon_layout_grid() -> Html {
    icon_base("M3 3h8v8H3zM13 3h8v8h-8zM3 13h8v8H3zM13 13h8v8h-8z")
}
pub fn icon_settings() -> Html {
    icon_base("M12 1v3M12 20v3M4.2 4.2l2.1 2.1M17.7 17.7l2.1 2.1M1 12h3M20 12h3M4.2 19.8l2.1-2.1M17.7 6.3l2.1-2.1")
}
