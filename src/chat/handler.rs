//! Chat interaction handling
//!
//! One request-response cycle per incoming interaction: slash commands create
//! pending links or read-side views, component interactions drive the
//! stateless selection flows and pagination. Every reply is ephemeral.

use std::sync::Arc;

use tracing::error;

use crate::chat::control::{ControlId, PageDirection, SelectValue};
use crate::chat::interaction::{
    interaction_type, response_type, ActionRow, Button, Embed, EmbedField, Interaction,
    InteractionResponse, ResponseData, SelectOption, StringSelect, EPHEMERAL,
};
use crate::db::schemas::CreateLinkDoc;
use crate::history::{HistoryEngine, HistoryPage, HistoryRole};
use crate::links::{is_valid_address, LinkService};
use crate::network::{explorer_link, TOKEN_SYMBOL};
use crate::resolver::AddressResolver;
use crate::store::{LinkStore, VoteListFilter};
use crate::types::{Result, WicketError};

/// Select menus cap out at 25 options; older topics fall off the list
const MAX_SELECT_OPTIONS: usize = 25;

/// Embed accent color for history pages
const EMBED_COLOR: u32 = 0x00AE86;

pub struct ChatHandler {
    store: Arc<LinkStore>,
    resolver: Arc<AddressResolver>,
    links: Arc<LinkService>,
    history: Arc<HistoryEngine>,
}

impl ChatHandler {
    pub fn new(
        store: Arc<LinkStore>,
        resolver: Arc<AddressResolver>,
        links: Arc<LinkService>,
        history: Arc<HistoryEngine>,
    ) -> Self {
        Self {
            store,
            resolver,
            links,
            history,
        }
    }

    /// Handle one inbound interaction; never fails outward, errors become
    /// ephemeral failure messages
    pub async fn handle(&self, interaction: &Interaction) -> InteractionResponse {
        let result = match interaction.kind {
            interaction_type::PING => return InteractionResponse::pong(),
            interaction_type::APPLICATION_COMMAND => self.handle_command(interaction).await,
            interaction_type::MESSAGE_COMPONENT => self.handle_component(interaction).await,
            other => {
                return InteractionResponse::message(format!(
                    "Unsupported interaction type {}.",
                    other
                ))
            }
        };

        result.unwrap_or_else(|e| {
            error!("Interaction failed: {}", e);
            InteractionResponse::message("Something went wrong. Please try again.")
        })
    }

    async fn handle_command(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let Some(user) = interaction.user_id() else {
            return Ok(InteractionResponse::message("Could not identify you."));
        };
        let name = interaction
            .data
            .as_ref()
            .and_then(|d| d.name.as_deref())
            .unwrap_or_default();

        match name {
            "connect" => self.connect(user).await,
            "check" => self.check(user).await,
            "send" => self.send(interaction, user).await,
            "createvote" => self.create_vote(interaction, user).await,
            "vote" => self.vote_listing(user).await,
            "tally" => self.tally_listing(user).await,
            "result" => self.result_listing(user).await,
            "sender" => self.history_page(user, HistoryRole::Sender, 1).await,
            "receiver" => self.history_page(user, HistoryRole::Receiver, 1).await,
            _ => Ok(InteractionResponse::message("Unknown command.")),
        }
    }

    async fn handle_component(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let Some(user) = interaction.user_id() else {
            return Ok(InteractionResponse::message("Could not identify you."));
        };
        let custom_id = interaction
            .data
            .as_ref()
            .and_then(|d| d.custom_id.as_deref())
            .unwrap_or_default();

        match ControlId::parse(custom_id) {
            Some(ControlId::Paginate { role, direction, page }) => {
                let target = match direction {
                    PageDirection::Next => page + 1,
                    PageDirection::Prev => page.saturating_sub(1).max(1),
                };
                self.history_page(user, role, target).await
            }
            Some(ControlId::VoteList) => self.vote_topic_selected(interaction, user).await,
            Some(ControlId::VoteOption { create_id }) => {
                self.vote_option_selected(interaction, user, &create_id).await
            }
            Some(ControlId::TallyList) => self.tally_topic_selected(interaction, user).await,
            Some(ControlId::ResultList) => self.result_topic_selected(interaction).await,
            None => Ok(InteractionResponse::message("Unknown control.")),
        }
    }

    // --- Commands ---

    async fn connect(&self, user: &str) -> Result<InteractionResponse> {
        match self.links.create_user_link(user).await {
            Ok((_, url)) => Ok(InteractionResponse::message("Connect your wallet:")
                .with_components(vec![ActionRow::of(vec![Button::link("Connect 🔁", url)])])),
            Err(WicketError::Database(e)) => {
                error!("Connect link creation failed: {}", e);
                Ok(InteractionResponse::message("Failed to save user link."))
            }
            Err(e) => Err(e),
        }
    }

    async fn check(&self, user: &str) -> Result<InteractionResponse> {
        match self.resolver.resolve_address(user).await? {
            Some(address) => Ok(InteractionResponse::message(format!(
                "Your address is {}",
                address
            ))),
            None => Ok(InteractionResponse::message("No address connected.")),
        }
    }

    async fn send(&self, interaction: &Interaction, user: &str) -> Result<InteractionResponse> {
        let (Some(amount_raw), Some(to_raw)) = (
            interaction.option_str("amount"),
            interaction.option_str("to_address"),
        ) else {
            return Ok(InteractionResponse::message(
                "Please specify both amount and recipient.",
            ));
        };

        let amount: f64 = match amount_raw.parse() {
            Ok(v) if v > 0.0 => v,
            _ => {
                return Ok(InteractionResponse::message(
                    "Amount must be a positive number.",
                ))
            }
        };

        // The recipient is either a chat-user mention or a literal address
        let to_address = if to_raw.starts_with("<@") && to_raw.ends_with('>') {
            let mentioned: String = to_raw
                .chars()
                .filter(|c| !matches!(c, '<' | '@' | '!' | '>'))
                .collect();
            match self.resolver.resolve_address(&mentioned).await? {
                Some(address) => address,
                None => {
                    return Ok(InteractionResponse::message(
                        "No valid address connected for the user.",
                    ))
                }
            }
        } else if is_valid_address(to_raw) {
            to_raw.to_string()
        } else {
            return Ok(InteractionResponse::message(
                "Invalid address or user mention.",
            ));
        };

        match self.links.create_send_link(user, &to_address, amount).await {
            Ok((link, url)) => Ok(InteractionResponse::message(format!(
                "{} {} to {}",
                link.amount, TOKEN_SYMBOL, link.to_address
            ))
            .with_components(vec![ActionRow::of(vec![Button::link("Send 💸", url)])])),
            Err(WicketError::Database(e)) => {
                error!("Send link creation failed: {}", e);
                Ok(InteractionResponse::message("Failed to save send link."))
            }
            Err(e) => Err(e),
        }
    }

    async fn create_vote(&self, interaction: &Interaction, user: &str) -> Result<InteractionResponse> {
        let Some(topic) = interaction.option_str("topic") else {
            return Ok(InteractionResponse::message("Please specify a topic."));
        };

        // option1..option10, the first two required by command registration
        let options: Vec<String> = (1..=10)
            .filter_map(|i| interaction.option_str(&format!("option{}", i)))
            .map(ToString::to_string)
            .collect();

        let channel = interaction.channel();
        match self
            .links
            .create_create_link(user, topic, options, channel)
            .await
        {
            Ok((_, url)) => Ok(InteractionResponse::message("Connect wallet to create:")
                .with_components(vec![ActionRow::of(vec![Button::link("Connect 🔁", url)])])),
            Err(WicketError::InvalidInput(_)) => Ok(InteractionResponse::message(
                "A vote needs a topic and between 2 and 10 options.",
            )),
            Err(WicketError::Database(e)) => {
                error!("Create link creation failed: {}", e);
                Ok(InteractionResponse::message("Failed to save create link."))
            }
            Err(e) => Err(e),
        }
    }

    /// Topic selection list shared by the vote, tally, and result flows
    fn topic_select(
        &self,
        prompt: &str,
        control: ControlId,
        lists: Vec<CreateLinkDoc>,
        value_for: fn(String) -> SelectValue,
    ) -> InteractionResponse {
        let options: Vec<SelectOption> = lists
            .into_iter()
            .take(MAX_SELECT_OPTIONS)
            .map(|l| SelectOption {
                label: l.topic,
                value: value_for(l.id).to_value(),
                description: Some(format!("created by <@{}>", l.user)),
            })
            .collect();

        InteractionResponse::message(prompt).with_components(vec![ActionRow::of(vec![
            StringSelect::of(control.to_custom_id(), options),
        ])])
    }

    async fn vote_listing(&self, _user: &str) -> Result<InteractionResponse> {
        let lists = self
            .store
            .list_create_links(VoteListFilter {
                exclude_finished: true,
                creator: None,
            })
            .await?;
        if lists.is_empty() {
            return Ok(InteractionResponse::message("No votes available."));
        }
        Ok(self.topic_select(
            "Choose a topic you want to vote for:",
            ControlId::VoteList,
            lists,
            SelectValue::VoteTopic,
        ))
    }

    async fn tally_listing(&self, user: &str) -> Result<InteractionResponse> {
        let lists = self
            .store
            .list_create_links(VoteListFilter {
                exclude_finished: true,
                creator: Some(user),
            })
            .await?;
        if lists.is_empty() {
            return Ok(InteractionResponse::message("No votes can be tallied by you."));
        }
        Ok(self.topic_select(
            "Choose a topic you want to declare winner:",
            ControlId::TallyList,
            lists,
            SelectValue::TallyTopic,
        ))
    }

    async fn result_listing(&self, _user: &str) -> Result<InteractionResponse> {
        let lists = self
            .store
            .list_create_links(VoteListFilter {
                exclude_finished: false,
                creator: None,
            })
            .await?;
        if lists.is_empty() {
            return Ok(InteractionResponse::message("No votes found."));
        }
        Ok(self.topic_select(
            "Choose a topic you want to check the voting result:",
            ControlId::ResultList,
            lists,
            SelectValue::ResultTopic,
        ))
    }

    // --- Component selections ---

    async fn vote_topic_selected(
        &self,
        interaction: &Interaction,
        _user: &str,
    ) -> Result<InteractionResponse> {
        let Some(SelectValue::VoteTopic(create_id)) =
            interaction.selected_value().and_then(SelectValue::parse)
        else {
            return Ok(InteractionResponse::message("Unknown selection."));
        };
        let Some(create) = self.store.create_link_by_id(&create_id).await? else {
            return Ok(InteractionResponse::message("That vote no longer exists."));
        };

        // Second step: the chosen vote's id rides in the select's custom_id
        let options: Vec<SelectOption> = create
            .options
            .iter()
            .enumerate()
            .map(|(index, label)| SelectOption {
                label: label.clone(),
                value: SelectValue::Choice(index as u32).to_value(),
                description: None,
            })
            .collect();

        Ok(
            InteractionResponse::message(format!("**{}**: choose an option", create.topic))
                .with_components(vec![ActionRow::of(vec![StringSelect::of(
                    ControlId::VoteOption { create_id: create.id }.to_custom_id(),
                    options,
                )])]),
        )
    }

    async fn vote_option_selected(
        &self,
        interaction: &Interaction,
        user: &str,
        create_id: &str,
    ) -> Result<InteractionResponse> {
        let Some(SelectValue::Choice(choice)) =
            interaction.selected_value().and_then(SelectValue::parse)
        else {
            return Ok(InteractionResponse::message("Unknown selection."));
        };

        match self.links.create_vote_link(user, create_id, choice).await {
            Ok((_, url)) => Ok(InteractionResponse::message("Connect wallet to vote:")
                .with_components(vec![ActionRow::of(vec![Button::link("Vote ✅", url)])])),
            Err(WicketError::NotFound(_)) => {
                Ok(InteractionResponse::message("That vote no longer exists."))
            }
            Err(WicketError::InvalidInput(_)) => {
                Ok(InteractionResponse::message("That option no longer exists."))
            }
            Err(WicketError::Database(e)) => {
                error!("Vote link creation failed: {}", e);
                Ok(InteractionResponse::message("Failed to save vote link."))
            }
            Err(e) => Err(e),
        }
    }

    async fn tally_topic_selected(
        &self,
        interaction: &Interaction,
        user: &str,
    ) -> Result<InteractionResponse> {
        let Some(SelectValue::TallyTopic(create_id)) =
            interaction.selected_value().and_then(SelectValue::parse)
        else {
            return Ok(InteractionResponse::message("Unknown selection."));
        };
        let Some(create) = self.store.create_link_by_id(&create_id).await? else {
            return Ok(InteractionResponse::message("That vote no longer exists."));
        };
        // The listing only offers own votes; enforce the same on dispatch
        if create.user != user {
            return Ok(InteractionResponse::message(
                "Only the creator can tally a vote.",
            ));
        }

        match self.links.create_tally_link(user, &create_id).await {
            Ok((_, url)) => Ok(InteractionResponse::message("Connect wallet to declare winner:")
                .with_components(vec![ActionRow::of(vec![Button::link("Tally Vote 💸", url)])])),
            Err(WicketError::Database(e)) => {
                error!("Tally link creation failed: {}", e);
                Ok(InteractionResponse::message("Failed to save tally link."))
            }
            Err(e) => Err(e),
        }
    }

    async fn result_topic_selected(&self, interaction: &Interaction) -> Result<InteractionResponse> {
        let Some(SelectValue::ResultTopic(create_id)) =
            interaction.selected_value().and_then(SelectValue::parse)
        else {
            return Ok(InteractionResponse::message("Unknown selection."));
        };
        let Some(create) = self.store.create_link_by_id(&create_id).await? else {
            return Ok(InteractionResponse::message("That vote no longer exists."));
        };

        let votes = self.store.vote_links_for(&create.id).await?;
        let mut counts = vec![0usize; create.options.len()];
        for vote in &votes {
            if let Some(count) = counts.get_mut(vote.choice as usize) {
                *count += 1;
            }
        }

        let mut content = format!(
            "**{}** ({})\n",
            create.topic,
            if create.is_finished() { "finished" } else { "open" }
        );
        for (label, count) in create.options.iter().zip(&counts) {
            content.push_str(&format!("{}: {} vote(s)\n", label, count));
        }
        if create.is_finished() {
            if let Some(winner) = counts
                .iter()
                .enumerate()
                .max_by_key(|(_, count)| **count)
                .and_then(|(index, _)| create.options.get(index))
            {
                content.push_str(&format!("Winner: {}", winner));
            }
        }

        Ok(InteractionResponse::message(content))
    }

    // --- History ---

    async fn history_page(
        &self,
        user: &str,
        role: HistoryRole,
        page: u32,
    ) -> Result<InteractionResponse> {
        // Both roles require a connected address, matching the command's
        // user-facing contract
        if self.resolver.resolve_address(user).await?.is_none() {
            return Ok(InteractionResponse::message("No address connected."));
        }

        let page_data = match self.history.page(user, role, page).await {
            Ok(p) => p,
            Err(WicketError::NotFound(_)) => {
                return Ok(InteractionResponse::message("No address connected."))
            }
            Err(e) => return Err(e),
        };
        if page_data.items.is_empty() {
            return Ok(InteractionResponse::message("No transactions found."));
        }

        Ok(render_history(role, &page_data))
    }
}

/// Render one history page as an embed with pagination controls
fn render_history(role: HistoryRole, page: &HistoryPage) -> InteractionResponse {
    let counterpart_label = match role {
        HistoryRole::Sender => "Receiver Address",
        HistoryRole::Receiver => "Sender Address",
    };

    let fields: Vec<EmbedField> = page
        .items
        .iter()
        .map(|item| {
            let time = item.generate_time.to_chrono().format("%Y-%m-%d %H:%M:%S UTC");
            let mut value = format!(
                "**{}:** {}\n**Time:** {}",
                counterpart_label, item.counterpart_address, time
            );
            if let Some(link) = item
                .network
                .as_deref()
                .and_then(|n| explorer_link(n, &item.transaction_hash))
            {
                value.push_str(&format!("\n[explorer🔗]({})", link));
            }
            EmbedField {
                name: format!("Amount: {}", item.amount),
                value,
                inline: false,
            }
        })
        .collect();

    let embed = Embed {
        title: format!("Transactions (Page {})", page.page),
        color: EMBED_COLOR,
        fields,
    };

    let mut buttons = vec![Button::primary(
        "Previous Page",
        ControlId::Paginate {
            role,
            direction: PageDirection::Prev,
            page: page.page,
        }
        .to_custom_id(),
        !page.has_previous(),
    )];
    if page.has_next {
        buttons.push(Button::primary(
            "Next Page",
            ControlId::Paginate {
                role,
                direction: PageDirection::Next,
                page: page.page,
            }
            .to_custom_id(),
            false,
        ));
    }

    InteractionResponse {
        kind: response_type::CHANNEL_MESSAGE_WITH_SOURCE,
        data: Some(ResponseData {
            content: None,
            embeds: vec![embed],
            components: vec![ActionRow::of(buttons)],
            flags: Some(EPHEMERAL),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::schemas::{SendLinkDoc, UserLinkDoc};
    use bson::DateTime;
    use serde_json::{json, Value};

    fn handler() -> (Arc<LinkStore>, ChatHandler) {
        let store = Arc::new(LinkStore::memory());
        let resolver = Arc::new(AddressResolver::new(Arc::clone(&store)));
        let links = Arc::new(LinkService::new(Arc::clone(&store), "http://localhost:3000"));
        let history = Arc::new(HistoryEngine::new(Arc::clone(&store), Arc::clone(&resolver)));
        let chat = ChatHandler::new(Arc::clone(&store), resolver, links, history);
        (store, chat)
    }

    fn command(name: &str, user: &str, options: Value) -> Interaction {
        serde_json::from_value(json!({
            "type": 2,
            "data": { "name": name, "options": options },
            "member": { "user": { "id": user } },
            "channel_id": "chan-1"
        }))
        .unwrap()
    }

    fn component(custom_id: &str, user: &str, values: Vec<String>) -> Interaction {
        serde_json::from_value(json!({
            "type": 3,
            "data": { "custom_id": custom_id, "values": values },
            "member": { "user": { "id": user } }
        }))
        .unwrap()
    }

    async fn connect_with_address(store: &LinkStore, user: &str, address: &str, millis: i64) {
        let mut link = UserLinkDoc::new(user, &format!("ul-{}-{}", user, millis));
        link.address = address.to_string();
        link.generate_time = DateTime::from_millis(millis);
        store.insert_user_link(&link).await.unwrap();
    }

    #[tokio::test]
    async fn test_ping_pongs() {
        let (_, chat) = handler();
        let interaction: Interaction = serde_json::from_value(json!({ "type": 1 })).unwrap();
        let response = chat.handle(&interaction).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], 1);
    }

    #[tokio::test]
    async fn test_connect_creates_a_pending_user_link() {
        let (store, chat) = handler();
        let response = chat.handle(&command("connect", "alice", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "Connect your wallet:");

        let url = value["data"]["components"][0]["components"][0]["url"]
            .as_str()
            .unwrap();
        let token = url.rsplit('/').next().unwrap();
        let link = store.user_link_by_token(token).await.unwrap().unwrap();
        assert!(link.is_placeholder());
        assert_eq!(link.user, "alice");
    }

    #[tokio::test]
    async fn test_check_without_address() {
        let (_, chat) = handler();
        let response = chat.handle(&command("check", "alice", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "No address connected.");
    }

    #[tokio::test]
    async fn test_send_resolves_mentioned_recipient() {
        let (store, chat) = handler();
        connect_with_address(&store, "bob", "0xbobaddr", 1_000).await;

        let options = json!([
            { "name": "amount", "value": "5" },
            { "name": "to_address", "value": "<@bob>" }
        ]);
        let response = chat.handle(&command("send", "alice", options)).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], format!("5 {} to 0xbobaddr", TOKEN_SYMBOL));

        let unconnected = json!([
            { "name": "amount", "value": "5" },
            { "name": "to_address", "value": "<@carol>" }
        ]);
        let response = chat.handle(&command("send", "alice", unconnected)).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value["data"]["content"],
            "No valid address connected for the user."
        );
    }

    #[tokio::test]
    async fn test_send_rejects_malformed_recipient() {
        let (_, chat) = handler();
        let options = json!([
            { "name": "amount", "value": "5" },
            { "name": "to_address", "value": "not-an-address" }
        ]);
        let response = chat.handle(&command("send", "alice", options)).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "Invalid address or user mention.");

        let missing = json!([{ "name": "amount", "value": "5" }]);
        let response = chat.handle(&command("send", "alice", missing)).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value["data"]["content"],
            "Please specify both amount and recipient."
        );
    }

    #[tokio::test]
    async fn test_vote_listing_skips_finished_topics() {
        let (store, chat) = handler();
        let open = CreateLinkDoc::new("alice", "c1", "Lunch", vec!["a".into(), "b".into()], "chan");
        let mut closed = CreateLinkDoc::new("alice", "c2", "Dinner", vec!["a".into(), "b".into()], "chan");
        closed.finished = Some(true);
        let mut reopened = CreateLinkDoc::new("bob", "c3", "Snacks", vec!["a".into(), "b".into()], "chan");
        reopened.finished = Some(false);
        store.insert_create_link(&open).await.unwrap();
        store.insert_create_link(&closed).await.unwrap();
        store.insert_create_link(&reopened).await.unwrap();

        let response = chat.handle(&command("vote", "carol", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        let options = value["data"]["components"][0]["components"][0]["options"]
            .as_array()
            .unwrap();
        assert_eq!(options.len(), 2);
        let labels: Vec<&str> = options.iter().map(|o| o["label"].as_str().unwrap()).collect();
        assert!(labels.contains(&"Lunch"));
        assert!(labels.contains(&"Snacks"));
    }

    #[tokio::test]
    async fn test_two_step_vote_flow_is_stateless() {
        let (store, chat) = handler();
        let create = CreateLinkDoc::new(
            "alice",
            "c1",
            "Lunch",
            vec!["pizza".into(), "sushi".into()],
            "chan",
        );
        store.insert_create_link(&create).await.unwrap();

        // Step one: topic selection answers with an option select whose
        // custom_id carries the create id
        let selection = component("vote_list", "bob", vec![format!("votelist_{}", create.id)]);
        let response = chat.handle(&selection).await;
        let value = serde_json::to_value(&response).unwrap();
        let select = &value["data"]["components"][0]["components"][0];
        assert_eq!(
            select["custom_id"].as_str().unwrap(),
            format!("voteoption_{}", create.id)
        );
        assert_eq!(select["options"].as_array().unwrap().len(), 2);

        // Step two: option selection creates the pending VoteLink
        let choice = component(
            &format!("voteoption_{}", create.id),
            "bob",
            vec!["option_1".to_string()],
        );
        let response = chat.handle(&choice).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "Connect wallet to vote:");

        let votes = store.vote_links_for(&create.id).await.unwrap();
        assert_eq!(votes.len(), 1);
        assert_eq!(votes[0].choice, 1);
        assert_eq!(votes[0].user, "bob");
    }

    #[tokio::test]
    async fn test_tally_listing_only_offers_own_votes() {
        let (store, chat) = handler();
        let own = CreateLinkDoc::new("alice", "c1", "Lunch", vec!["a".into(), "b".into()], "chan");
        let other = CreateLinkDoc::new("bob", "c2", "Dinner", vec!["a".into(), "b".into()], "chan");
        store.insert_create_link(&own).await.unwrap();
        store.insert_create_link(&other).await.unwrap();

        let response = chat.handle(&command("tally", "alice", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        let options = value["data"]["components"][0]["components"][0]["options"]
            .as_array()
            .unwrap();
        assert_eq!(options.len(), 1);
        assert_eq!(options[0]["label"], "Lunch");

        // Dispatch re-checks ownership
        let stolen = component("tally_list", "mallory", vec![format!("tallylist_{}", own.id)]);
        let response = chat.handle(&stolen).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "Only the creator can tally a vote.");

        let response = chat
            .handle(&command("tally", "mallory", json!([])))
            .await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "No votes can be tallied by you.");
    }

    #[tokio::test]
    async fn test_result_reports_counts_and_winner() {
        let (store, chat) = handler();
        let mut create = CreateLinkDoc::new(
            "alice",
            "c1",
            "Lunch",
            vec!["pizza".into(), "sushi".into()],
            "chan",
        );
        create.finished = Some(true);
        store.insert_create_link(&create).await.unwrap();

        for (n, choice) in [(1, 0), (2, 0), (3, 1)] {
            let vote = crate::db::schemas::VoteLinkDoc::new(
                &format!("voter{}", n),
                &format!("v{}", n),
                choice,
                &create.id,
            );
            store.insert_vote_link(&vote).await.unwrap();
        }

        let selection = component("result_list", "bob", vec![format!("resultlist_{}", create.id)]);
        let response = chat.handle(&selection).await;
        let value = serde_json::to_value(&response).unwrap();
        let content = value["data"]["content"].as_str().unwrap();
        assert!(content.contains("pizza: 2 vote(s)"));
        assert!(content.contains("sushi: 1 vote(s)"));
        assert!(content.contains("Winner: pizza"));
    }

    #[tokio::test]
    async fn test_history_page_one_disables_previous() {
        let (store, chat) = handler();
        connect_with_address(&store, "alice", "0xalice", 100).await;
        for n in 1..=11 {
            let token = format!("s{}", n);
            let mut link = SendLinkDoc::new("alice", &token, "0xdest", n as f64);
            link.generate_time = DateTime::from_millis(n * 1_000);
            store.insert_send_link(&link).await.unwrap();
            store
                .complete_send_link(&token, &format!("h{}", n), "Testnet")
                .await
                .unwrap();
        }

        let response = chat.handle(&command("sender", "alice", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(
            value["data"]["embeds"][0]["fields"].as_array().unwrap().len(),
            10
        );

        let buttons = value["data"]["components"][0]["components"].as_array().unwrap();
        assert_eq!(buttons.len(), 2);
        assert_eq!(buttons[0]["label"], "Previous Page");
        assert_eq!(buttons[0]["disabled"], true);
        assert_eq!(buttons[1]["label"], "Next Page");
        assert_eq!(buttons[1]["custom_id"], "paginate_sender_next_1");

        // Follow the next-page control
        let response = chat.handle(&component("paginate_sender_next_1", "alice", vec![])).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["embeds"][0]["title"], "Transactions (Page 2)");
        let buttons = value["data"]["components"][0]["components"].as_array().unwrap();
        assert_eq!(buttons.len(), 1);
        assert!(buttons[0].get("disabled").is_none());
    }

    #[tokio::test]
    async fn test_history_without_address_or_transfers() {
        let (store, chat) = handler();
        let response = chat.handle(&command("sender", "alice", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "No address connected.");

        connect_with_address(&store, "alice", "0xalice", 100).await;
        let response = chat.handle(&command("sender", "alice", json!([]))).await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["data"]["content"], "No transactions found.");
    }
}
