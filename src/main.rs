use yew::prelude::*;

pub mod api;
pub mod decoder;
pub mod error;
pub mod focus;
pub mod product;
pub mod scan;
pub mod session;

use crate::product::ProductPage;
use crate::scan::Scanner;
use crate::session::{PermissionState, ScannerState};

#[derive(Clone, PartialEq)]
enum View {
    Scan,
    Product(String),
}

#[function_component(App)]
fn app() -> Html {
    let view = use_state(|| View::Scan);

    let on_found = {
        let view = view.clone();
        Callback::from(move |barcode: String| view.set(View::Product(barcode)))
    };
    let on_back = {
        let view = view.clone();
        Callback::from(move |_| view.set(View::Scan))
    };

    html! {
        <>
            <style>
                {"
                    body { margin: 0; font-family: system-ui, sans-serif; background: #eef2ff; }
                    .page { max-width: 42rem; margin: 0 auto; padding: 1rem; }
                    .card { background: #fff; border-radius: 0.5rem; box-shadow: 0 4px 12px rgba(0,0,0,0.08); padding: 1.5rem; margin-bottom: 1rem; }
                    .card-center { display: flex; flex-direction: column; align-items: center; gap: 0.75rem; text-align: center; }
                    .details { border-top: 1px solid #e5e7eb; margin-top: 1rem; padding-top: 1rem; }
                    .row { display: flex; justify-content: space-between; padding: 0.35rem 0; }
                    .label { color: #6b7280; }
                    .mono { font-family: monospace; }
                    .price { font-size: 1.5rem; font-weight: 700; color: #16a34a; }
                    .stock-ok { color: #16a34a; font-weight: 600; }
                    .stock-low { color: #ca8a04; font-weight: 600; }
                    .stock-out { color: #dc2626; font-weight: 600; }
                    .badge { width: 4rem; height: 4rem; border-radius: 9999px; display: flex; align-items: center; justify-content: center; font-size: 1.5rem; }
                    .badge-ok { background: #dcfce7; color: #16a34a; }
                    .badge-warn { background: #fef9c3; color: #ca8a04; }
                    .badge-error { background: #fee2e2; color: #dc2626; }
                    .action { padding: 0.75rem 1.5rem; background: #2563eb; color: #fff; border: none; border-radius: 0.5rem; cursor: pointer; font-size: 1rem; }
                    .action:active { background: #1e40af; }
                    .action-wide { width: 100%; margin-top: 1rem; }
                    .back-link { background: none; border: none; color: #2563eb; cursor: pointer; font-size: 1rem; padding: 0; margin-bottom: 1rem; }
                    .status-line { color: #6b7280; font-size: 0.875rem; }
                    .panel { padding: 1rem; border-radius: 0.5rem; margin-bottom: 1rem; }
                    .panel-error { background: #fef2f2; border: 1px solid #fecaca; color: #991b1b; }
                    .panel-code { background: #f0fdf4; border: 1px solid #bbf7d0; color: #166534; }
                    .panel-code .code { font-family: monospace; font-size: 1.125rem; }
                    .spinner { width: 3rem; height: 3rem; border: 3px solid #e5e7eb; border-bottom-color: #2563eb; border-radius: 9999px; animation: spin 1s linear infinite; }
                    @keyframes spin { to { transform: rotate(360deg); } }
                "}
            </style>
            {
                match &*view {
                    View::Scan => html! { <ScanPage on_found={on_found} /> },
                    View::Product(barcode) => html! {
                        <ProductPage barcode={barcode.clone()} on_back={on_back} />
                    },
                }
            }
        </>
    }
}

#[derive(Properties, PartialEq, Clone)]
struct ScanPageProps {
    on_found: Callback<String>,
}

/// Scan page: activation controls, status line and the scanner itself.
#[function_component(ScanPage)]
fn scan_page(props: &ScanPageProps) -> Html {
    let is_active = use_state(|| false);
    let scanner_state = use_state(|| ScannerState::Inactive);
    let permission = use_state(|| PermissionState::Prompt);
    let last_code = use_state(|| None::<String>);
    let error = use_state(|| None::<String>);

    let start = {
        let is_active = is_active.clone();
        let error = error.clone();
        Callback::from(move |_| {
            error.set(None);
            is_active.set(true);
        })
    };
    let stop = {
        let is_active = is_active.clone();
        Callback::from(move |_| is_active.set(false))
    };

    let on_scan_success = {
        let last_code = last_code.clone();
        let error = error.clone();
        let on_found = props.on_found.clone();
        Callback::from(move |barcode: String| {
            last_code.set(Some(barcode.clone()));
            error.set(None);
            on_found.emit(barcode);
        })
    };
    let on_scan_error = {
        let error = error.clone();
        Callback::from(move |message: String| error.set(Some(message)))
    };
    let on_state_change = {
        let scanner_state = scanner_state.clone();
        Callback::from(move |state: ScannerState| scanner_state.set(state))
    };
    let on_permission_change = {
        let permission = permission.clone();
        Callback::from(move |state: PermissionState| {
            log::info!("camera permission: {state}");
            permission.set(state);
        })
    };

    let error_panel = match &*error {
        Some(message) => html! { <div class="panel panel-error">{ message }</div> },
        None => html! {},
    };
    let code_panel = match &*last_code {
        Some(code) => html! {
            <div class="panel panel-code">
                <p>{ "Отсканирован код:" }</p>
                <p class="code">{ code }</p>
            </div>
        },
        None => html! {},
    };

    html! {
        <div class="page">
            <div class="card">
                <h1>{ "Сканер штрихкодов" }</h1>
                <p class="status-line">{ "Наведите камеру на штрихкод для сканирования" }</p>
                if !*is_active {
                    <button class="action action-wide" onclick={start}>
                        { "Начать сканирование" }
                    </button>
                } else {
                    <button class="action action-wide" onclick={stop}>
                        { "Остановить" }
                    </button>
                }
                { error_panel }
                { code_panel }
                <p class="status-line">
                    { format!("Статус: {}", scanner_state_label(*scanner_state)) }
                </p>
            </div>
            <Scanner
                is_active={*is_active}
                on_scan_success={on_scan_success}
                on_scan_error={on_scan_error}
                on_state_change={on_state_change}
                on_permission_change={on_permission_change}
            />
        </div>
    }
}

fn scanner_state_label(state: ScannerState) -> &'static str {
    match state {
        ScannerState::Inactive => "Неактивен",
        ScannerState::Initializing => "Инициализация...",
        ScannerState::Active => "Активен",
        ScannerState::Scanning => "Сканирование...",
        ScannerState::Error => "Ошибка",
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::start_app::<App>();
}
