//! Multi-step operator dialogues.
//!
//! Every dialogue is a value of [`DialogueState`]; feeding it one inbound
//! message through [`Dialogue::advance`] yields the reply and the next state
//! (`None` once the dialogue is over). Input errors keep the state and
//! re-prompt. Store failures keep the state too, so the operator can resend
//! the same answer.

use std::sync::Arc;

use pies_types::domain::catalog::Catalog;
use pies_types::domain::customer::{Customer, CustomerId};
use pies_types::domain::order::{parse_quantity, LineItem, OrderId};
use pies_types::domain::schedule::{parse_delivery, DateRange};
use pies_types::ports::store::Store;

use crate::application::chat::{Button, Inbound, Keyboard, Reply};
use crate::application::messages::{self, is_token, DONE_TOKENS, NEW_CUSTOMER_TOKENS};
use crate::application::order_service::OrderService;
use crate::errors::AppError;

pub const CUSTOMER_PREFIX: &str = "customer:";
pub const ITEM_PREFIX: &str = "item:";
pub const ITEMS_DONE: &str = "items:done";

/// More matches than this and the operator is asked to narrow the search.
const MAX_CANDIDATES: usize = 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueState {
    AddCustomer(AddCustomerStep),
    Order(OrderStep),
    Report,
    DeleteOrder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddCustomerStep {
    AwaitingName,
    AwaitingPhone { name: String },
}

/// Order entry. Each variant carries exactly what has been collected so far.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderStep {
    AwaitingCustomerSelector,
    AwaitingCustomerDisambiguation { candidates: Vec<Customer> },
    AwaitingNewCustomerName,
    AwaitingNewCustomerPhone { name: String },
    AwaitingAddress { customer: Customer },
    AwaitingItemSelection(OrderDraft),
    AwaitingQuantity { draft: OrderDraft, item: String },
    AwaitingDeliveryDate(OrderDraft),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDraft {
    pub customer: Customer,
    pub address: String,
    pub items: Vec<LineItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub next: Option<DialogueState>,
    pub reply: Reply,
}

impl Step {
    fn to(next: DialogueState, reply: Reply) -> Self {
        Self {
            next: Some(next),
            reply,
        }
    }

    fn order(next: OrderStep, reply: Reply) -> Self {
        Self::to(DialogueState::Order(next), reply)
    }

    fn finish(reply: Reply) -> Self {
        Self { next: None, reply }
    }
}

enum ItemChoice {
    Item(String),
    Done,
    Unknown(String),
}

pub struct Dialogue<S: Store> {
    service: Arc<OrderService<S>>,
}

impl<S: Store> Dialogue<S> {
    pub fn new(service: Arc<OrderService<S>>) -> Self {
        Self { service }
    }

    pub fn start_order(&self) -> Step {
        Step::order(
            OrderStep::AwaitingCustomerSelector,
            Reply::text(messages::ASK_CUSTOMER).with_keyboard(new_customer_keyboard()),
        )
    }

    pub fn start_add_customer(&self) -> Step {
        Step::to(
            DialogueState::AddCustomer(AddCustomerStep::AwaitingName),
            Reply::text(messages::ASK_NEW_NAME),
        )
    }

    pub fn start_report(&self) -> Step {
        Step::to(DialogueState::Report, Reply::text(messages::ASK_REPORT_RANGE))
    }

    pub fn start_delete(&self) -> Step {
        Step::to(DialogueState::DeleteOrder, Reply::text(messages::ASK_ORDER_ID))
    }

    pub async fn advance(&self, state: DialogueState, input: Inbound) -> Step {
        match (state, input) {
            (DialogueState::Order(step), input) => self.order(step, input).await,
            (DialogueState::AddCustomer(step), Inbound::Text(text)) => {
                self.add_customer(step, &text).await
            }
            (DialogueState::Report, Inbound::Text(text)) => self.report(&text).await,
            (DialogueState::DeleteOrder, Inbound::Text(text)) => self.delete(&text).await,
            (state, Inbound::Callback(_)) => Step::to(state, Reply::text(messages::TEXT_EXPECTED)),
        }
    }

    fn catalog(&self) -> &Catalog {
        self.service.catalog()
    }

    fn storage_failure(&self, state: DialogueState, err: AppError) -> Step {
        tracing::error!(error = %err, "store operation failed, dialogue kept");
        Step::to(state, Reply::text(messages::GENERIC_FAILURE))
    }

    async fn add_customer(&self, step: AddCustomerStep, text: &str) -> Step {
        match step {
            AddCustomerStep::AwaitingName => {
                if text.trim().is_empty() {
                    return Step::to(
                        DialogueState::AddCustomer(AddCustomerStep::AwaitingName),
                        Reply::text(messages::ASK_NEW_NAME),
                    );
                }
                Step::to(
                    DialogueState::AddCustomer(AddCustomerStep::AwaitingPhone {
                        name: text.trim().to_string(),
                    }),
                    Reply::text(messages::ASK_PHONE),
                )
            }
            AddCustomerStep::AwaitingPhone { name } => {
                let current = DialogueState::AddCustomer(AddCustomerStep::AwaitingPhone {
                    name: name.clone(),
                });
                if text.trim().is_empty() {
                    return Step::to(current, Reply::text(messages::ASK_PHONE));
                }
                match self.service.create_customer(&name, text).await {
                    Ok(id) => Step::finish(Reply::text(messages::customer_created(id, &name))),
                    Err(e) => self.storage_failure(current, e),
                }
            }
        }
    }

    async fn order(&self, step: OrderStep, input: Inbound) -> Step {
        use OrderStep::*;

        match (step, input) {
            (AwaitingCustomerSelector, Inbound::Text(query)) => {
                self.select_customer(AwaitingCustomerSelector, &query).await
            }
            (AwaitingCustomerDisambiguation { candidates }, Inbound::Callback(data)) => {
                pick_candidate(candidates, &data)
            }
            // Typing instead of picking starts a new search.
            (AwaitingCustomerDisambiguation { candidates }, Inbound::Text(query)) => {
                self.select_customer(AwaitingCustomerDisambiguation { candidates }, &query)
                    .await
            }
            (AwaitingNewCustomerName, Inbound::Text(name)) => {
                if name.trim().is_empty() {
                    return Step::order(AwaitingNewCustomerName, Reply::text(messages::ASK_NEW_NAME));
                }
                Step::order(
                    AwaitingNewCustomerPhone {
                        name: name.trim().to_string(),
                    },
                    Reply::text(messages::ASK_PHONE),
                )
            }
            (AwaitingNewCustomerPhone { name }, Inbound::Text(phone)) => {
                self.create_inline_customer(name, &phone).await
            }
            (AwaitingAddress { customer }, Inbound::Text(address)) => {
                let address = address.trim();
                let address = if address == messages::NO_ADDRESS {
                    String::new()
                } else {
                    address.to_string()
                };
                Step::order(
                    AwaitingItemSelection(OrderDraft {
                        customer,
                        address,
                        items: Vec::new(),
                    }),
                    Reply::text(messages::ASK_ITEM).with_keyboard(items_keyboard(self.catalog())),
                )
            }
            (AwaitingItemSelection(draft), input) => self.select_item(draft, input),
            (AwaitingQuantity { draft, item }, Inbound::Text(text)) => {
                self.add_quantity(draft, item, &text)
            }
            (AwaitingDeliveryDate(draft), Inbound::Text(text)) => {
                self.finish_order(draft, &text).await
            }
            (step, Inbound::Callback(_)) => {
                Step::order(step, Reply::text(messages::TEXT_EXPECTED))
            }
        }
    }

    async fn select_customer(&self, current: OrderStep, query: &str) -> Step {
        let query = query.trim();
        if is_token(query, NEW_CUSTOMER_TOKENS) {
            return Step::order(
                OrderStep::AwaitingNewCustomerName,
                Reply::text(messages::ASK_NEW_NAME).with_keyboard(Keyboard::Remove),
            );
        }
        if query.is_empty() {
            return Step::order(current, Reply::text(messages::ASK_CUSTOMER));
        }

        let mut found = match self.service.find_customers(query).await {
            Ok(found) => found,
            Err(e) => return self.storage_failure(DialogueState::Order(current), e),
        };
        match found.len() {
            0 => Step::order(
                OrderStep::AwaitingCustomerSelector,
                Reply::text(messages::no_customer_found(query)),
            ),
            1 => {
                let customer = found.remove(0);
                let text = messages::customer_bound(&customer);
                Step::order(
                    OrderStep::AwaitingAddress { customer },
                    Reply::text(text).with_keyboard(Keyboard::Remove),
                )
            }
            n if n > MAX_CANDIDATES => Step::order(
                OrderStep::AwaitingCustomerSelector,
                Reply::text(messages::too_many_customers(n)),
            ),
            _ => {
                let keyboard = candidates_keyboard(&found);
                Step::order(
                    OrderStep::AwaitingCustomerDisambiguation { candidates: found },
                    Reply::text(messages::PICK_CUSTOMER).with_keyboard(keyboard),
                )
            }
        }
    }

    async fn create_inline_customer(&self, name: String, phone: &str) -> Step {
        let current = OrderStep::AwaitingNewCustomerPhone { name: name.clone() };
        if phone.trim().is_empty() {
            return Step::order(current, Reply::text(messages::ASK_PHONE));
        }
        match self.service.create_customer(&name, phone).await {
            Ok(id) => {
                let customer = Customer {
                    id,
                    name,
                    phone: phone.trim().to_string(),
                };
                let text = format!(
                    "{}\n{}",
                    messages::customer_created(id, &customer.name),
                    messages::ASK_ADDRESS
                );
                Step::order(OrderStep::AwaitingAddress { customer }, Reply::text(text))
            }
            Err(e) => self.storage_failure(DialogueState::Order(current), e),
        }
    }

    fn select_item(&self, draft: OrderDraft, input: Inbound) -> Step {
        let catalog = self.catalog();
        let choice = match input {
            Inbound::Callback(data) if data == ITEMS_DONE => ItemChoice::Done,
            Inbound::Callback(data) => data
                .strip_prefix(ITEM_PREFIX)
                .and_then(|i| i.parse::<usize>().ok())
                .and_then(|i| catalog.get(i))
                .map(|it| ItemChoice::Item(it.name.clone()))
                .unwrap_or(ItemChoice::Unknown(data)),
            Inbound::Text(text) if is_token(&text, DONE_TOKENS) => ItemChoice::Done,
            Inbound::Text(text) => catalog
                .find(&text)
                .map(|it| ItemChoice::Item(it.name.clone()))
                .unwrap_or(ItemChoice::Unknown(text)),
        };

        match choice {
            ItemChoice::Done if draft.items.is_empty() => Step::order(
                OrderStep::AwaitingItemSelection(draft),
                Reply::text(messages::NEED_ITEMS).with_keyboard(items_keyboard(catalog)),
            ),
            ItemChoice::Done => Step::order(
                OrderStep::AwaitingDeliveryDate(draft),
                Reply::text(messages::ask_delivery()),
            ),
            ItemChoice::Item(item) => {
                let text = messages::ask_quantity(&item);
                Step::order(OrderStep::AwaitingQuantity { draft, item }, Reply::text(text))
            }
            ItemChoice::Unknown(input) => Step::order(
                OrderStep::AwaitingItemSelection(draft),
                Reply::text(messages::unknown_item(&input)).with_keyboard(items_keyboard(catalog)),
            ),
        }
    }

    fn add_quantity(&self, mut draft: OrderDraft, item: String, text: &str) -> Step {
        let line = parse_quantity(text).and_then(|q| self.catalog().line_item(&item, q));
        match line {
            Ok(line) => {
                draft.items.push(line);
                let text = messages::cart(&draft.items);
                Step::order(
                    OrderStep::AwaitingItemSelection(draft),
                    Reply::text(text).with_keyboard(items_keyboard(self.catalog())),
                )
            }
            Err(_) => {
                let text = messages::bad_quantity(&item);
                Step::order(OrderStep::AwaitingQuantity { draft, item }, Reply::text(text))
            }
        }
    }

    async fn finish_order(&self, draft: OrderDraft, text: &str) -> Step {
        let delivery_at = match parse_delivery(text) {
            Ok(ts) => ts,
            Err(_) => {
                return Step::order(
                    OrderStep::AwaitingDeliveryDate(draft),
                    Reply::text(messages::bad_delivery()),
                )
            }
        };

        let created = self
            .service
            .create_order(
                draft.customer.id,
                draft.address.clone(),
                draft.items.clone(),
                delivery_at,
            )
            .await;
        match created {
            Ok((id, order)) => Step::finish(Reply::text(messages::order_confirmation(
                id,
                &draft.customer,
                &order,
            ))),
            Err(AppError::Validation(e)) => {
                tracing::warn!(error = %e, "draft no longer matches the catalog");
                let text = messages::order_rejected(&e, &draft.items);
                Step::order(
                    OrderStep::AwaitingItemSelection(draft),
                    Reply::text(text).with_keyboard(items_keyboard(self.catalog())),
                )
            }
            Err(e) => {
                self.storage_failure(DialogueState::Order(OrderStep::AwaitingDeliveryDate(draft)), e)
            }
        }
    }

    async fn report(&self, text: &str) -> Step {
        let range = match DateRange::parse_report(text) {
            Ok(range) => range,
            Err(e) => {
                return Step::to(
                    DialogueState::Report,
                    Reply::text(messages::bad_report_range(&e)),
                )
            }
        };
        match self.service.list_orders(range).await {
            Ok(rows) => Step::finish(Reply::text(messages::report(&range, &rows))),
            Err(e) => self.storage_failure(DialogueState::Report, e),
        }
    }

    async fn delete(&self, text: &str) -> Step {
        let id = match OrderId::parse(text) {
            Ok(id) => id,
            Err(e) => {
                return Step::to(
                    DialogueState::DeleteOrder,
                    Reply::text(messages::bad_order_id(&e)),
                )
            }
        };
        match self.service.delete_order(id).await {
            Ok(deleted) => Step::finish(Reply::text(messages::order_deleted(id, deleted))),
            Err(e) => self.storage_failure(DialogueState::DeleteOrder, e),
        }
    }
}

fn pick_candidate(candidates: Vec<Customer>, data: &str) -> Step {
    let picked = data
        .strip_prefix(CUSTOMER_PREFIX)
        .and_then(|id| id.parse::<i64>().ok())
        .map(CustomerId)
        .and_then(|id| candidates.iter().find(|c| c.id == id).cloned());
    match picked {
        Some(customer) => {
            let text = messages::customer_bound(&customer);
            Step::order(OrderStep::AwaitingAddress { customer }, Reply::text(text))
        }
        None => {
            let keyboard = candidates_keyboard(&candidates);
            Step::order(
                OrderStep::AwaitingCustomerDisambiguation { candidates },
                Reply::text(messages::PICK_CUSTOMER).with_keyboard(keyboard),
            )
        }
    }
}

fn new_customer_keyboard() -> Keyboard {
    Keyboard::Options(vec![vec![messages::NEW_CUSTOMER_LABEL.to_string()]])
}

fn candidates_keyboard(candidates: &[Customer]) -> Keyboard {
    Keyboard::Inline(
        candidates
            .iter()
            .map(|c| {
                vec![Button::new(
                    format!("{} ({})", c.name, c.phone),
                    format!("{}{}", CUSTOMER_PREFIX, c.id),
                )]
            })
            .collect(),
    )
}

/// Two catalog items per row, then the done button.
fn items_keyboard(catalog: &Catalog) -> Keyboard {
    let buttons: Vec<Button> = catalog
        .items()
        .iter()
        .enumerate()
        .map(|(i, it)| Button::new(format!("{} · {}", it.name, it.price), format!("{ITEM_PREFIX}{i}")))
        .collect();
    let mut rows: Vec<Vec<Button>> = buttons.chunks(2).map(<[Button]>::to_vec).collect();
    rows.push(vec![Button::new(messages::DONE_LABEL, ITEMS_DONE)]);
    Keyboard::Inline(rows)
}
