//! Product record and the found/not-found/error/loading views.

use serde::Deserialize;
use yew::prelude::*;

use crate::api::{self, LookupOutcome};

/// Product record as served by the lookup service. Read-only here.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ProductData {
    pub id: String,
    pub ean: String,
    pub name: String,
    pub price: f64,
    pub quantity: i32,
    pub min_quantity: i32,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockLevel {
    /// Above the minimum-quantity threshold.
    Ok,
    /// In stock but at or below the threshold.
    Low,
    Out,
}

impl ProductData {
    pub fn stock_level(&self) -> StockLevel {
        if self.quantity <= 0 {
            StockLevel::Out
        } else if self.quantity <= self.min_quantity {
            StockLevel::Low
        } else {
            StockLevel::Ok
        }
    }

    pub fn unit_label(&self) -> &str {
        self.unit.as_deref().unwrap_or("шт.")
    }
}

#[derive(Properties, PartialEq, Clone)]
pub struct ProductViewProps {
    pub product: Option<ProductData>,
    pub loading: bool,
    #[prop_or_default]
    pub error: Option<String>,
    #[prop_or_default]
    pub on_scan_again: Callback<()>,
}

/// Result card under the scanner: spinner, error, not-found or the record.
#[function_component(ProductView)]
pub fn product_view(props: &ProductViewProps) -> Html {
    let scan_again = {
        let on_scan_again = props.on_scan_again.clone();
        Callback::from(move |_| on_scan_again.emit(()))
    };

    if props.loading {
        return html! {
            <div class="card">
                <div class="card-center">
                    <div class="spinner"></div>
                    <p>{ "Поиск товара..." }</p>
                </div>
            </div>
        };
    }

    if let Some(error) = &props.error {
        return html! {
            <div class="card">
                <div class="card-center">
                    <div class="badge badge-error">{ "✖" }</div>
                    <h3>{ "Ошибка" }</h3>
                    <p>{ error }</p>
                    <button class="action" onclick={scan_again}>{ "Попробовать снова" }</button>
                </div>
            </div>
        };
    }

    let Some(product) = &props.product else {
        return html! {
            <div class="card">
                <div class="card-center">
                    <div class="badge badge-warn">{ "!" }</div>
                    <h3>{ "Товар не найден" }</h3>
                    <p>{ "Товар с таким штрихкодом отсутствует в базе данных" }</p>
                    <button class="action" onclick={scan_again}>{ "Сканировать снова" }</button>
                </div>
            </div>
        };
    };

    let stock_class = match product.stock_level() {
        StockLevel::Ok => "stock-ok",
        StockLevel::Low => "stock-low",
        StockLevel::Out => "stock-out",
    };

    html! {
        <div class="card">
            <div class="card-center">
                <div class="badge badge-ok">{ "✓" }</div>
                <h2>{ &product.name }</h2>
            </div>
            <div class="details">
                <div class="row">
                    <span class="label">{ "EAN:" }</span>
                    <span class="mono">{ &product.ean }</span>
                </div>
                <div class="row">
                    <span class="label">{ "Цена:" }</span>
                    <span class="price">{ format!("{:.2} ₽", product.price) }</span>
                </div>
                <div class="row">
                    <span class="label">{ "На складе:" }</span>
                    <span class={stock_class}>
                        { format!("{} {}", product.quantity, product.unit_label()) }
                    </span>
                </div>
                <div class="row">
                    <span class="label">{ "Мин. остаток:" }</span>
                    <span>{ format!("{} {}", product.min_quantity, product.unit_label()) }</span>
                </div>
                { optional_row("Расположение:", product.location.as_deref()) }
                { optional_row("Категория:", product.category.as_deref()) }
            </div>
            <button class="action action-wide" onclick={scan_again}>
                { "Сканировать другой товар" }
            </button>
        </div>
    }
}

fn optional_row(label: &str, value: Option<&str>) -> Html {
    match value {
        Some(value) => html! {
            <div class="row">
                <span class="label">{ label }</span>
                <span>{ value }</span>
            </div>
        },
        None => html! {},
    }
}

#[derive(Properties, PartialEq, Clone)]
pub struct ProductPageProps {
    pub barcode: String,
    #[prop_or_default]
    pub on_back: Callback<()>,
}

/// Looks the scanned barcode up and renders the result.
#[function_component(ProductPage)]
pub fn product_page(props: &ProductPageProps) -> Html {
    let product = use_state(|| None::<ProductData>);
    let loading = use_state(|| true);
    let error = use_state(|| None::<String>);

    {
        let product = product.clone();
        let loading = loading.clone();
        let error = error.clone();
        use_effect_with_deps(
            move |barcode: &String| {
                let barcode = barcode.clone();
                loading.set(true);
                error.set(None);
                wasm_bindgen_futures::spawn_local(async move {
                    match api::fetch_product(&barcode).await {
                        Ok(LookupOutcome::Found(found)) => product.set(Some(found)),
                        Ok(LookupOutcome::NotFound) => product.set(None),
                        Err(err) => {
                            log::error!("ошибка при загрузке товара: {err}");
                            error.set(Some(err.to_string()));
                        }
                    }
                    loading.set(false);
                });
                || ()
            },
            props.barcode.clone(),
        );
    }

    let on_back = {
        let on_back = props.on_back.clone();
        Callback::from(move |_| on_back.emit(()))
    };

    html! {
        <div class="page">
            <button class="back-link" onclick={&on_back}>{ "← Назад к сканеру" }</button>
            <h1>{ "Информация о товаре" }</h1>
            <ProductView
                product={(*product).clone()}
                loading={*loading}
                error={(*error).clone()}
                on_scan_again={props.on_back.clone()}
            />
        </div>
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(quantity: i32, min_quantity: i32) -> ProductData {
        ProductData {
            id: "p-1".into(),
            ean: "5909990944514".into(),
            name: "Test Product 1".into(),
            price: 48.12,
            quantity,
            min_quantity,
            location: None,
            category: None,
            unit: None,
        }
    }

    #[test]
    fn stock_above_threshold_is_ok() {
        assert_eq!(product(78, 5).stock_level(), StockLevel::Ok);
    }

    #[test]
    fn stock_at_or_below_threshold_is_low() {
        assert_eq!(product(5, 5).stock_level(), StockLevel::Low);
        assert_eq!(product(1, 5).stock_level(), StockLevel::Low);
    }

    #[test]
    fn zero_stock_is_out() {
        assert_eq!(product(0, 5).stock_level(), StockLevel::Out);
    }

    #[test]
    fn missing_optional_fields_deserialize_to_none() {
        let parsed: ProductData = serde_json::from_str(
            r#"{
                "id": "p-2",
                "ean": "8850024101571",
                "name": "Balsam 50g",
                "price": 18.7,
                "quantity": 48,
                "min_quantity": 5
            }"#,
        )
        .unwrap();
        assert_eq!(parsed.location, None);
        assert_eq!(parsed.unit_label(), "шт.");
    }
}
