//! Topic screen: read, post, edit and delete messages.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::api::ForumApi;
use crate::logutil::escape_log;
use crate::markup;
use crate::models::{Message, Topic, TopicRef, User};
use crate::ui::{Confirm, ConfirmPrompt, Notifier};
use crate::views::{ViewContext, ViewError, ViewResult, GENERIC_ERROR, INPUT_ERROR};

/// A message ready for display: body already translated to display markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub id: Option<i64>,
    pub author: String,
    pub date: DateTime<Utc>,
    pub html: String,
    /// The signed-in user may edit or delete this message.
    pub editable: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Posted(Message),
    Updated(Message),
}

pub struct TopicView<A: ForumApi, N: Notifier, C: Confirm> {
    ctx: ViewContext<A, N, C>,
    topic: Option<Topic>,
    editing: Option<i64>,
}

impl<A: ForumApi, N: Notifier, C: Confirm> TopicView<A, N, C> {
    pub fn new(ctx: ViewContext<A, N, C>) -> Self {
        Self {
            ctx,
            topic: None,
            editing: None,
        }
    }

    pub fn topic(&self) -> Option<&Topic> {
        self.topic.as_ref()
    }

    /// Id of the message currently being edited.
    pub fn editing(&self) -> Option<i64> {
        self.editing
    }

    /// Fetch and show topic `id`.
    pub async fn open(&mut self, id: i64) -> ViewResult<&Topic> {
        match self.ctx.api.get_topic(id).await {
            Ok(topic) => {
                debug!("Opened topic {} with {} messages", id, topic.messages.len());
                self.editing = None;
                Ok(self.topic.insert(topic))
            }
            Err(e) => {
                self.ctx.error(GENERIC_ERROR);
                Err(e.into())
            }
        }
    }

    /// Re-fetch the open topic. The latest successful fetch always wins.
    pub async fn refresh(&mut self, show_notice: bool) -> ViewResult<()> {
        let id = self.topic_id()?;
        match self.ctx.api.get_topic(id).await {
            Ok(topic) => {
                self.apply(topic);
                if show_notice {
                    self.ctx.info("Messages refreshed");
                }
                Ok(())
            }
            Err(e) => {
                self.ctx
                    .error("An error occurred while refreshing messages");
                Err(e.into())
            }
        }
    }

    /// Replace the displayed topic with a freshly fetched copy (e.g. from a [`TopicWatch`]).
    ///
    /// Edit mode survives only if the edited message is still there.
    pub fn apply(&mut self, topic: Topic) {
        if let Some(id) = self.editing {
            if topic.message_index(id).is_none() {
                self.editing = None;
            }
        }
        self.topic = Some(topic);
    }

    /// Toggle edit mode for message `id`.
    ///
    /// Returns the text to prefill the editor with, or `None` when edit mode was left.
    pub fn select_message(&mut self, id: i64) -> ViewResult<Option<String>> {
        if self.editing == Some(id) {
            self.editing = None;
            return Ok(None);
        }
        let message = self.find_message(id)?;
        if !self.can_modify(message) {
            return Err(ViewError::Forbidden);
        }
        let draft = message.content.clone();
        self.editing = Some(id);
        Ok(Some(draft))
    }

    /// Leave edit mode without saving.
    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Post a new message, or save the edited one when in edit mode.
    pub async fn submit(&mut self, content: &str) -> ViewResult<SubmitOutcome> {
        self.ctx.rules.validate_message(content)?;
        let author = self
            .ctx
            .state
            .connected_user()
            .ok_or(ViewError::NotSignedIn)?;
        match self.editing {
            None => self.post(author, content).await,
            Some(id) => self.update(id, content).await,
        }
    }

    async fn post(&mut self, author: User, content: &str) -> ViewResult<SubmitOutcome> {
        let topic_id = self.topic_id()?;
        let draft = Message {
            id: None,
            content: content.to_string(),
            date: Utc::now(),
            author: Some(author),
            topic: Some(TopicRef { id: topic_id }),
        };
        let posted = match self.ctx.api.post_message(&draft).await {
            Ok(m) => m,
            Err(e) => {
                self.ctx.error(INPUT_ERROR);
                return Err(e.into());
            }
        };
        info!(
            "Posted message {:?} in topic {}: {}",
            posted.id,
            topic_id,
            escape_log(&posted.content)
        );
        match self.ctx.api.get_topic(topic_id).await {
            Ok(topic) => self.apply(topic),
            Err(e) => {
                // The post went through; show it even though the reload failed.
                warn!("Reloading topic {} after post failed: {}", topic_id, e);
                if let Some(topic) = self.topic.as_mut() {
                    topic.messages.push(posted.clone());
                }
            }
        }
        self.ctx.info("Your message has been sent");
        Ok(SubmitOutcome::Posted(posted))
    }

    async fn update(&mut self, id: i64, content: &str) -> ViewResult<SubmitOutcome> {
        let original = self.find_message(id)?;
        if !self.can_modify(original) {
            return Err(ViewError::Forbidden);
        }
        let edited = Message {
            content: content.to_string(),
            ..original.clone()
        };
        let saved = match self.ctx.api.update_message(&edited).await {
            Ok(m) => m,
            Err(e) => {
                self.ctx.error(INPUT_ERROR);
                return Err(e.into());
            }
        };
        let saved_id = saved.id.unwrap_or(id);
        let slot = self
            .topic
            .as_mut()
            .and_then(|t| t.messages.iter_mut().find(|m| m.id == Some(saved_id)));
        match slot {
            Some(slot) => {
                *slot = saved.clone();
                self.editing = None;
                self.ctx.info("Your message has been updated");
                Ok(SubmitOutcome::Updated(saved))
            }
            None => {
                self.ctx.error(INPUT_ERROR);
                Err(ViewError::UnknownMessage(saved_id))
            }
        }
    }

    /// Delete message `id` after confirmation. `Ok(false)` means the user declined.
    pub async fn delete_message(&mut self, id: i64) -> ViewResult<bool> {
        let message = self.find_message(id)?;
        if !self.can_modify(message) {
            return Err(ViewError::Forbidden);
        }
        if !self
            .ctx
            .confirm
            .confirm(&ConfirmPrompt::delete("message"))
            .await
        {
            debug!("Deletion of message {} declined", id);
            return Ok(false);
        }
        if let Err(e) = self.ctx.api.delete_message(id).await {
            self.ctx.error(GENERIC_ERROR);
            return Err(e.into());
        }
        if let Some(topic) = self.topic.as_mut() {
            if let Some(index) = topic.message_index(id) {
                topic.messages.remove(index);
                self.ctx.info("This message has been deleted");
            }
        }
        if self.editing == Some(id) {
            self.editing = None;
        }
        info!("Deleted message {}", id);
        Ok(true)
    }

    /// Authors may change their own messages; administrators may change any.
    pub fn can_modify(&self, message: &Message) -> bool {
        match self.ctx.state.connected_user() {
            Some(user) => user.admin || message.is_authored_by(&user),
            None => false,
        }
    }

    /// Messages of the open topic with bodies translated for display.
    pub fn rendered(&self) -> Vec<RenderedMessage> {
        let Some(topic) = self.topic.as_ref() else {
            return Vec::new();
        };
        topic
            .messages
            .iter()
            .map(|m| RenderedMessage {
                id: m.id,
                author: m.author_name().to_string(),
                date: m.date,
                html: markup::translate(&m.content),
                editable: self.can_modify(m),
            })
            .collect()
    }

    fn topic_id(&self) -> ViewResult<i64> {
        self.topic
            .as_ref()
            .and_then(|t| t.id)
            .ok_or(ViewError::NoTopic)
    }

    fn find_message(&self, id: i64) -> ViewResult<&Message> {
        let topic = self.topic.as_ref().ok_or(ViewError::NoTopic)?;
        topic
            .messages
            .iter()
            .find(|m| m.id == Some(id))
            .ok_or(ViewError::UnknownMessage(id))
    }
}

/// Background refresh of one topic at a fixed interval.
///
/// The first fetch happens one interval after start. Failed fetches are logged and the
/// previous copy kept. The task stops when the watch is dropped.
pub struct TopicWatch {
    handle: JoinHandle<()>,
    rx: watch::Receiver<Option<Topic>>,
}

impl TopicWatch {
    pub fn start<A: ForumApi>(api: Arc<A>, topic_id: i64, every: Duration) -> Self {
        let (tx, rx) = watch::channel(None);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + every, every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match api.get_topic(topic_id).await {
                    Ok(topic) => {
                        debug!("Polled topic {}: {} messages", topic_id, topic.messages.len());
                        tx.send_replace(Some(topic));
                    }
                    Err(e) => warn!("Polling topic {} failed: {}", topic_id, e),
                }
                if tx.is_closed() {
                    break;
                }
            }
        });
        Self { handle, rx }
    }

    /// Wait for the next successful refresh.
    pub async fn next(&mut self) -> Option<Topic> {
        loop {
            self.rx.changed().await.ok()?;
            if let Some(topic) = self.rx.borrow_and_update().clone() {
                return Some(topic);
            }
        }
    }

    /// Most recent copy fetched by the watch, if any.
    pub fn latest(&self) -> Option<Topic> {
        self.rx.borrow().clone()
    }
}

impl Drop for TopicWatch {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
