//! Operator-facing texts.

use pies_types::domain::catalog::Price;
use pies_types::domain::customer::{Customer, CustomerId};
use pies_types::domain::order::{LineItem, NewOrder, OrderId, OrderWithCustomer};
use pies_types::domain::schedule::{format_delivery, DateRange, DAY_EXAMPLE, DELIVERY_EXAMPLE};
use pies_types::domain::ValidationError;

pub const HELP: &str = "Привет! Я помогаю вести заказы пирогов.\n\n\
/new_order — новый заказ\n\
/add_client — добавить клиента\n\
/clients — список клиентов\n\
/report — заказы за день или период\n\
/delete_order — удалить заказ\n\
/cancel — отменить текущее действие\n\n\
За сутки до доставки я пришлю напоминание.";

pub const UNKNOWN_INPUT: &str = "Не понимаю. Наберите /help, чтобы увидеть команды.";
pub const STALE_BUTTON: &str = "Эта кнопка уже не действует. Начните заново: /help";
pub const GENERIC_FAILURE: &str = "Что-то пошло не так, попробуйте ещё раз чуть позже.";
pub const CANCELLED: &str = "Отменено.";
pub const NOTHING_TO_CANCEL: &str = "Нечего отменять.";
pub const TEXT_EXPECTED: &str = "Пожалуйста, ответьте сообщением.";

pub const ASK_CUSTOMER: &str =
    "Введите имя или телефон клиента для поиска, или «новый» для нового клиента.";
pub const ASK_NEW_NAME: &str = "Имя нового клиента?";
pub const ASK_PHONE: &str = "Телефон клиента?";
pub const ASK_ADDRESS: &str = "Адрес доставки? Отправьте «-», если адреса нет.";
pub const PICK_CUSTOMER: &str = "Нашлось несколько клиентов, выберите нужного:";
pub const ASK_ITEM: &str = "Выберите пирог или нажмите «Готово».";
pub const NEED_ITEMS: &str = "Добавьте хотя бы один пирог.";
pub const ASK_REPORT_RANGE: &str = "Введите дату (ДД.ММ.ГГГГ) или две даты через пробел.";
pub const ASK_ORDER_ID: &str = "Номер заказа для удаления?";

pub const NEW_CUSTOMER_TOKENS: &[&str] = &["новый", "new"];
pub const DONE_TOKENS: &[&str] = &["готово", "done"];
pub const DONE_LABEL: &str = "Готово";
pub const NEW_CUSTOMER_LABEL: &str = "новый";
/// Address reply meaning "no address".
pub const NO_ADDRESS: &str = "-";

pub fn is_token(input: &str, tokens: &[&str]) -> bool {
    let input = input.trim().to_lowercase();
    tokens.iter().any(|t| *t == input)
}

pub fn items_line(items: &[LineItem]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn no_customer_found(query: &str) -> String {
    format!("Клиент «{}» не найден. Попробуйте ещё раз или введите «новый».", query.trim())
}

pub fn customer_bound(customer: &Customer) -> String {
    format!("Клиент: {} ({}).\n{}", customer.name, customer.phone, ASK_ADDRESS)
}

pub fn customer_created(id: CustomerId, name: &str) -> String {
    format!("Клиент {} добавлен, номер {}.", name, id)
}

pub fn ask_quantity(item: &str) -> String {
    format!("Сколько «{}»?", item)
}

pub fn bad_quantity(item: &str) -> String {
    format!("Нужно целое число больше нуля. Сколько «{}»?", item)
}

pub fn unknown_item(name: &str) -> String {
    format!("Пирога «{}» нет в меню. {}", name.trim(), ASK_ITEM)
}

pub fn cart(items: &[LineItem]) -> String {
    format!("В заказе: {}.\n{}", items_line(items), ASK_ITEM)
}

pub fn ask_delivery() -> String {
    format!("Дата и время доставки? Например: {}", DELIVERY_EXAMPLE)
}

pub fn bad_delivery() -> String {
    format!("Не получилось разобрать дату. Формат: {}", DELIVERY_EXAMPLE)
}

pub fn bad_report_range(err: &ValidationError) -> String {
    match err {
        ValidationError::InvertedRange { .. } => {
            "Конечная дата раньше начальной. Попробуйте ещё раз.".to_string()
        }
        _ => format!(
            "Не получилось разобрать даты. Пример: {} или {} 20.02.2026",
            DAY_EXAMPLE, DAY_EXAMPLE
        ),
    }
}

pub fn bad_order_id(err: &ValidationError) -> String {
    match err {
        ValidationError::BadOrderId(input) => {
            format!("«{}» не похоже на номер заказа. Введите число.", input)
        }
        _ => "Введите номер заказа числом.".to_string(),
    }
}

pub fn too_many_customers(found: usize) -> String {
    format!("Нашлось {} клиентов, уточните запрос.", found)
}

/// The cart failed catalog checks at confirmation; the items stay for editing.
pub fn order_rejected(err: &ValidationError, items: &[LineItem]) -> String {
    let reason = match err {
        ValidationError::UnknownItem(name) => format!("Пирога «{}» больше нет в меню.", name),
        _ => "Заказ не прошёл проверку.".to_string(),
    };
    format!("{}\n{}", reason, cart(items))
}

pub fn order_deleted(id: OrderId, deleted: bool) -> String {
    if deleted {
        format!("Заказ #{} удалён.", id)
    } else {
        format!("Заказ #{} не найден.", id)
    }
}

fn price(p: Price) -> String {
    p.to_string()
}

pub fn order_confirmation(id: OrderId, customer: &Customer, order: &NewOrder) -> String {
    let mut text = format!(
        "Заказ #{} сохранён.\nКлиент: {} ({})\n",
        id, customer.name, customer.phone
    );
    if !order.address.is_empty() {
        text.push_str(&format!("Адрес: {}\n", order.address));
    }
    text.push_str(&format!(
        "Пироги: {}\nДоставка: {}\nСумма: {}",
        items_line(&order.items),
        format_delivery(&order.delivery_at),
        price(order.total_price)
    ));
    text
}

fn order_block(row: &OrderWithCustomer) -> String {
    let o = &row.order;
    let mut text = format!(
        "#{} {} — {} ({})\n",
        o.id,
        format_delivery(&o.delivery_at),
        row.customer_name,
        row.customer_phone
    );
    if !o.address.is_empty() {
        text.push_str(&format!("Адрес: {}\n", o.address));
    }
    text.push_str(&format!(
        "Пироги: {}\nСумма: {}",
        items_line(&o.items),
        price(o.total_price)
    ));
    text
}

pub fn report(range: &DateRange, rows: &[OrderWithCustomer]) -> String {
    let first = range.start.date();
    let last = range.end.date();
    let period = if first == last {
        first.format("%d.%m.%Y").to_string()
    } else {
        format!("{} – {}", first.format("%d.%m.%Y"), last.format("%d.%m.%Y"))
    };
    if rows.is_empty() {
        return format!("Заказов на {} нет.", period);
    }
    let total: Price = rows.iter().map(|r| r.order.total_price).sum();
    let blocks: Vec<String> = rows.iter().map(order_block).collect();
    format!(
        "Заказы на {} ({} шт.):\n\n{}\n\nИтого: {}",
        period,
        rows.len(),
        blocks.join("\n\n"),
        price(total)
    )
}

pub fn customers(list: &[Customer]) -> String {
    if list.is_empty() {
        return "Клиентов пока нет. Добавьте: /add_client".to_string();
    }
    let lines: Vec<String> = list
        .iter()
        .map(|c| format!("{}. {} — {}", c.id, c.name, c.phone))
        .collect();
    format!("Клиенты:\n{}", lines.join("\n"))
}

pub fn reminder(row: &OrderWithCustomer) -> String {
    let o = &row.order;
    let mut text = format!(
        "Напоминание: заказ #{} для {} ({}) на {}.\nПироги: {}\n",
        o.id,
        row.customer_name,
        row.customer_phone,
        format_delivery(&o.delivery_at),
        items_line(&o.items)
    );
    if !o.address.is_empty() {
        text.push_str(&format!("Адрес: {}\n", o.address));
    }
    text.push_str("Не забудьте подготовить!");
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use pies_types::domain::catalog::Catalog;
    use pies_types::domain::order::{Order, OrderStatus};

    fn row(address: &str) -> OrderWithCustomer {
        let catalog = Catalog::default();
        let ts = NaiveDate::from_ymd_opt(2026, 2, 18)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap();
        OrderWithCustomer {
            order: Order {
                id: OrderId(5),
                customer_id: CustomerId(1),
                address: address.into(),
                items: vec![
                    catalog.line_item("Яблочный", 2).unwrap(),
                    catalog.line_item("Сёмга", 1).unwrap(),
                ],
                created_at: ts,
                delivery_at: ts,
                total_price: 34000,
                status: OrderStatus::New,
            },
            customer_name: "Anna".into(),
            customer_phone: "555-0100".into(),
        }
    }

    #[test]
    fn tokens_ignore_case_and_spaces() {
        assert!(is_token(" Новый ", NEW_CUSTOMER_TOKENS));
        assert!(is_token("DONE", DONE_TOKENS));
        assert!(!is_token("новая", NEW_CUSTOMER_TOKENS));
    }

    #[test]
    fn reminder_names_customer_time_and_items() {
        let text = reminder(&row("12 Oak St"));
        assert!(text.contains("Anna"));
        assert!(text.contains("18.02.2026 14:00"));
        assert!(text.contains("Яблочный x 2, Сёмга x 1"));
        assert!(text.contains("12 Oak St"));
        assert!(!reminder(&row("")).contains("Адрес"));
    }

    #[test]
    fn report_lists_orders_and_total() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 18).unwrap();
        let range = DateRange::days(day, day).unwrap();
        let text = report(&range, &[row(""), row("")]);
        assert!(text.starts_with("Заказы на 18.02.2026 (2 шт.)"));
        assert!(text.contains("#5 18.02.2026 14:00 — Anna (555-0100)"));
        assert!(text.ends_with("Итого: 68000"));
        assert_eq!(report(&range, &[]), "Заказов на 18.02.2026 нет.");
    }
}
