mod api;
mod hooks;
mod model;
mod pages;
mod session;
mod stores;
mod toast;
mod widgets;

use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;
use yew_router::prelude::*;

use api::SupabaseClient;
use hooks::use_app_context;
use session::{gate, AppContext, Gate, SessionState};
use stores::{
    EntityStore, EntityStoreAction, EntityStoreHandle, TransactionStore, TransactionStoreAction,
    TransactionStoreHandle, UiAction, UiHandle, UiState,
};
use toast::{ToastHost, ToastState, Toaster};

#[derive(Clone, Copy, Routable, PartialEq, Eq, Debug)]
pub enum Route {
    #[at("/login")]
    Login,
    #[at("/private/dashboard")]
    Dashboard,
    #[at("/private/finance")]
    Finance,
    #[at("/")]
    Home,
    #[not_found]
    #[at("/404")]
    NotFound,
}

fn switch(route: Route) -> Html {
    match route {
        Route::Login => html! { <pages::LoginPage /> },
        Route::Dashboard => html! { <Protected><pages::DashboardPage /></Protected> },
        Route::Finance => html! { <Protected><pages::FinancePage /></Protected> },
        Route::Home | Route::NotFound => html! { <RedirectHandler /> },
    }
}

/// Landing and unknown paths resolve against the gate once initialization
/// has finished.
#[function_component(RedirectHandler)]
fn redirect_handler() -> Html {
    let ctx = use_app_context();
    match gate(&ctx.session) {
        Gate::Checking => checking_screen(),
        Gate::SignedIn => html! { <Redirect<Route> to={Route::Dashboard} /> },
        Gate::SignedOut => html! { <Redirect<Route> to={Route::Login} /> },
    }
}

fn checking_screen() -> Html {
    html! {
        <div class="flex min-h-screen items-center justify-center bg-background">
            <p class="text-sm text-muted-foreground">{ "Cargando..." }</p>
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct ProtectedProps {
    children: Children,
}

/// Gate for the private area. The view state and the read replicas live
/// here so every private page shares them; they drop on sign-out together
/// with the subtree.
#[function_component(Protected)]
fn protected(props: &ProtectedProps) -> Html {
    let ctx = use_app_context();
    let ui = use_reducer(UiState::default);
    let entity_store = use_reducer(EntityStore::default);
    let tx_store = use_reducer(TransactionStore::default);

    match gate(&ctx.session) {
        Gate::Checking => checking_screen(),
        Gate::SignedOut => html! { <Redirect<Route> to={Route::Login} /> },
        Gate::SignedIn => html! {
            <ContextProvider<UiHandle> context={ui}>
            <ContextProvider<EntityStoreHandle> context={entity_store}>
            <ContextProvider<TransactionStoreHandle> context={tx_store}>
                <div class="min-h-screen bg-background text-foreground">
                    <Header />
                    <main>{ for props.children.iter() }</main>
                </div>
            </ContextProvider<TransactionStoreHandle>>
            </ContextProvider<EntityStoreHandle>>
            </ContextProvider<UiHandle>>
        },
    }
}

#[function_component(Header)]
fn header() -> Html {
    let ctx = use_app_context();
    let ui = use_context::<UiHandle>().expect("UiState no está montado en el árbol");
    let entity_store =
        use_context::<EntityStoreHandle>().expect("EntityStore no está montado en el árbol");
    let tx_store = use_context::<TransactionStoreHandle>()
        .expect("TransactionStore no está montado en el árbol");
    let route = use_route::<Route>();
    let navigator = use_navigator();

    let name = ctx
        .session
        .user
        .as_ref()
        .map(|u| u.display_name().to_string())
        .unwrap_or_default();

    let sign_out = {
        let ctx = ctx.clone();
        let ui = ui.clone();
        let entity_store = entity_store.clone();
        let tx_store = tx_store.clone();
        Callback::from(move |_: MouseEvent| {
            ui.dispatch(UiAction::Reset);
            entity_store.dispatch(EntityStoreAction::Clear);
            tx_store.dispatch(TransactionStoreAction::Clear);
            let ctx = ctx.clone();
            spawn_local(async move {
                ctx.sign_out().await;
            });
        })
    };

    let nav_link = |target: Route, label: &'static str| {
        let active = route == Some(target);
        let navigator = navigator.clone();
        let ui = ui.clone();
        let onclick = Callback::from(move |_: MouseEvent| {
            ui.dispatch(UiAction::CloseMobileMenu);
            if let Some(navigator) = navigator.clone() {
                navigator.push(&target);
            }
        });
        html! {
            <button
                class={classes!(
                    "rounded-lg", "px-3", "py-2", "text-sm", "font-medium",
                    if active { "bg-primary text-primary-foreground" } else { "text-muted-foreground hover:bg-muted" },
                )}
                {onclick}
            >
                { label }
            </button>
        }
    };

    let toggle_menu = {
        let ui = ui.clone();
        Callback::from(move |_: MouseEvent| ui.dispatch(UiAction::ToggleMobileMenu))
    };

    html! {
        <header class="border-b bg-card">
            <div class="mx-auto flex max-w-5xl items-center justify-between gap-3 px-4 py-3">
                <div class="flex items-center gap-4">
                    <span class="text-lg font-bold">{ "Conusper" }</span>
                    <nav class="hidden gap-1 sm:flex">
                        { nav_link(Route::Dashboard, "Inicio") }
                        { nav_link(Route::Finance, "Finanzas") }
                    </nav>
                </div>
                <div class="flex items-center gap-3">
                    <span class="hidden text-sm text-muted-foreground sm:inline">{ name }</span>
                    <button
                        class="hidden items-center gap-2 rounded-lg border px-3 py-2 text-sm hover:bg-muted sm:flex"
                        onclick={sign_out.clone()}
                    >
                        { widgets::icon_log_out() }
                        { "Salir" }
                    </button>
                    <button class="sm:hidden" onclick={toggle_menu} aria-label="Menú">
                        { widgets::icon_layout_grid() }
                    </button>
                </div>
            </div>
            if ui.mobile_menu_open {
                <nav class="flex flex-col gap-1 border-t px-4 py-2 sm:hidden">
                    { nav_link(Route::Dashboard, "Inicio") }
                    { nav_link(Route::Finance, "Finanzas") }
                    <button
                        class="rounded-lg px-3 py-2 text-left text-sm font-medium text-muted-foreground hover:bg-muted"
                        onclick={sign_out}
                    >
                        { "Salir" }
                    </button>
                </nav>
            }
        </header>
    }
}

#[function_component(App)]
fn app() -> Html {
    let client = use_memo(|_| SupabaseClient::new(), ());
    let session = use_reducer(SessionState::default);
    let toasts = use_reducer(ToastState::default);
    let toaster = Toaster::new(toasts);

    let ctx = AppContext {
        client,
        session,
        toaster: toaster.clone(),
    };

    // Standing auth subscription plus the one-shot session recovery. The
    // subscription drops with the app root.
    {
        let ctx = ctx.clone();
        use_effect_with_deps(
            move |_| {
                let subscription = ctx.client.subscribe(Callback::from({
                    let ctx = ctx.clone();
                    move |change| ctx.handle_auth_change(change)
                }));
                let ctx = ctx.clone();
                spawn_local(async move {
                    ctx.initialize().await;
                });
                move || drop(subscription)
            },
            (),
        );
    }

    html! {
        <ContextProvider<AppContext> context={ctx}>
            <BrowserRouter>
                <Switch<Route> render={switch} />
            </BrowserRouter>
            <ToastHost toaster={toaster} />
        </ContextProvider<AppContext>>
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("iniciando la aplicación");
    yew::Renderer::<App>::new().render();
}
