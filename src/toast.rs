use std::rc::Rc;

use gloo_timers::callback::Timeout;
use yew::prelude::*;

const AUTO_DISMISS_MS: u32 = 4_000;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ToastKind {
    Success,
    Error,
}

#[derive(Clone, PartialEq, Debug)]
pub struct Toast {
    pub id: u32,
    pub kind: ToastKind,
    pub message: String,
}

#[derive(Clone, PartialEq, Debug, Default)]
pub struct ToastState {
    pub toasts: Vec<Toast>,
    next_id: u32,
}

pub enum ToastAction {
    Push(ToastKind, String),
    Dismiss(u32),
}

impl Reducible for ToastState {
    type Action = ToastAction;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        match action {
            ToastAction::Push(kind, message) => {
                let id = next.next_id;
                next.next_id = next.next_id.wrapping_add(1);
                next.toasts.push(Toast { id, kind, message });
            }
            ToastAction::Dismiss(id) => next.toasts.retain(|t| t.id != id),
        }
        Rc::new(next)
    }
}

/// Clonable handle for raising notifications from anywhere in the tree.
#[derive(Clone, PartialEq)]
pub struct Toaster {
    handle: UseReducerHandle<ToastState>,
}

impl Toaster {
    pub fn new(handle: UseReducerHandle<ToastState>) -> Self {
        Self { handle }
    }

    pub fn success(&self, message: impl Into<String>) {
        self.handle
            .dispatch(ToastAction::Push(ToastKind::Success, message.into()));
    }

    pub fn error(&self, message: impl Into<String>) {
        self.handle
            .dispatch(ToastAction::Push(ToastKind::Error, message.into()));
    }

    pub fn dismiss(&self, id: u32) {
        self.handle.dispatch(ToastAction::Dismiss(id));
    }

    pub fn toasts(&self) -> Vec<Toast> {
        self.handle.toasts.clone()
    }
}

#[derive(Properties, PartialEq)]
pub struct ToastHostProps {
    pub toaster: Toaster,
}

#[function_component(ToastHost)]
pub fn toast_host(props: &ToastHostProps) -> Html {
    let toaster = props.toaster.clone();
    html! {
        <div class="toast toast-top toast-end z-[100]">
            { for toaster.toasts().into_iter().map(|toast| {
                let on_dismiss = {
                    let toaster = toaster.clone();
                    Callback::from(move |id: u32| toaster.dismiss(id))
                };
                html! { <ToastItem key={toast.id} toast={toast.clone()} {on_dismiss} /> }
            }) }
        </div>
    }
}

#[derive(Properties, PartialEq)]
struct ToastItemProps {
    toast: Toast,
    on_dismiss: Callback<u32>,
}

#[function_component(ToastItem)]
fn toast_item(props: &ToastItemProps) -> Html {
    let id = props.toast.id;

    {
        let on_dismiss = props.on_dismiss.clone();
        use_effect_with_deps(
            move |_| {
                let timeout = Timeout::new(AUTO_DISMISS_MS, move || on_dismiss.emit(id));
                move || drop(timeout)
            },
            (),
        );
    }

    let (alert_class, icon) = match props.toast.kind {
        ToastKind::Success => ("alert alert-success shadow-lg", "✓"),
        ToastKind::Error => ("alert alert-error shadow-lg", "✕"),
    };

    let on_click = {
        let on_dismiss = props.on_dismiss.clone();
        Callback::from(move |_| on_dismiss.emit(id))
    };

    html! {
        <div class={alert_class} role="alert" onclick={on_click}>
            <span class="font-bold">{ icon }</span>
            <span>{ &props.toast.message }</span>
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_assigns_increasing_ids() {
        let state = Rc::new(ToastState::default());
        let state = state.reduce(ToastAction::Push(ToastKind::Error, "uno".into()));
        let state = state.reduce(ToastAction::Push(ToastKind::Success, "dos".into()));
        assert_eq!(state.toasts.len(), 2);
        assert!(state.toasts[0].id < state.toasts[1].id);
        assert_eq!(state.toasts[0].message, "uno");
    }

    #[test]
    fn dismiss_removes_only_the_target() {
        let state = Rc::new(ToastState::default());
        let state = state.reduce(ToastAction::Push(ToastKind::Error, "uno".into()));
        let state = state.reduce(ToastAction::Push(ToastKind::Error, "dos".into()));
        let keep = state.toasts[1].id;
        let drop_id = state.toasts[0].id;
        let state = state.reduce(ToastAction::Dismiss(drop_id));
        assert_eq!(state.toasts.len(), 1);
        assert_eq!(state.toasts[0].id, keep);
    }
}
