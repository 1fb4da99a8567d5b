//! Shared test doubles: an in-memory backend, a notice recorder and a scripted confirm.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};

use bbforum::api::{ApiError, ApiResult, ForumApi};
use bbforum::models::{Message, Topic, TopicRef, User, UserUpdate};
use bbforum::session::SessionStore;
use bbforum::state::AppState;
use bbforum::ui::{Confirm, ConfirmPrompt, Notice, NoticeLevel, Notifier};
use bbforum::views::ViewContext;

#[allow(dead_code)]
#[derive(Default)]
struct Backend {
    topics: BTreeMap<i64, Topic>,
    users: Vec<User>,
    next_id: i64,
    failing: HashSet<&'static str>,
    calls: Vec<String>,
    last_user_update: Option<UserUpdate>,
    update_reply_id: Option<i64>,
}

/// In-memory forum backend.
#[allow(dead_code)]
#[derive(Default)]
pub struct FakeApi {
    inner: Mutex<Backend>,
}

#[allow(dead_code)]
impl FakeApi {
    pub fn new() -> Self {
        let api = Self::default();
        api.inner.lock().unwrap().next_id = 100;
        api
    }

    pub fn with_topic(self, topic: Topic) -> Self {
        let id = topic.id.expect("fixture topic needs an id");
        self.inner.lock().unwrap().topics.insert(id, topic);
        self
    }

    pub fn with_users(self, users: Vec<User>) -> Self {
        self.inner.lock().unwrap().users = users;
        self
    }

    /// Make `op` (e.g. "get_topic") fail with a 500 until cleared.
    pub fn fail(&self, op: &'static str) {
        self.inner.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: &'static str) {
        self.inner.lock().unwrap().failing.remove(op);
    }

    pub fn calls(&self, op: &str) -> usize {
        self.inner
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|c| c.as_str() == op)
            .count()
    }

    pub fn topic(&self, id: i64) -> Option<Topic> {
        self.inner.lock().unwrap().topics.get(&id).cloned()
    }

    pub fn users(&self) -> Vec<User> {
        self.inner.lock().unwrap().users.clone()
    }

    pub fn last_user_update(&self) -> Option<UserUpdate> {
        self.inner.lock().unwrap().last_user_update.clone()
    }

    /// Answer every message update with record `id`, as a backend that re-keys on save.
    pub fn answer_updates_with_id(&self, id: i64) {
        self.inner.lock().unwrap().update_reply_id = Some(id);
    }

    /// Change a topic behind the client's back.
    pub fn edit_topic(&self, id: i64, f: impl FnOnce(&mut Topic)) {
        if let Some(topic) = self.inner.lock().unwrap().topics.get_mut(&id) {
            f(topic);
        }
    }

    fn enter(&self, op: &'static str) -> ApiResult<std::sync::MutexGuard<'_, Backend>> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(op.to_string());
        if inner.failing.contains(op) {
            return Err(ApiError::Status(500));
        }
        Ok(inner)
    }
}

impl ForumApi for FakeApi {
    async fn list_topics(&self) -> ApiResult<Vec<Topic>> {
        let inner = self.enter("list_topics")?;
        Ok(inner.topics.values().cloned().collect())
    }

    async fn get_topic(&self, id: i64) -> ApiResult<Topic> {
        let inner = self.enter("get_topic")?;
        inner.topics.get(&id).cloned().ok_or(ApiError::Status(404))
    }

    async fn post_message(&self, message: &Message) -> ApiResult<Message> {
        let mut inner = self.enter("post_message")?;
        let topic_id = message.topic.ok_or(ApiError::Status(400))?.id;
        inner.next_id += 1;
        let stored = Message {
            id: Some(inner.next_id),
            ..message.clone()
        };
        let topic = inner.topics.get_mut(&topic_id).ok_or(ApiError::Status(404))?;
        topic.messages.push(stored.clone());
        Ok(stored)
    }

    async fn update_message(&self, message: &Message) -> ApiResult<Message> {
        let mut inner = self.enter("update_message")?;
        let id = message.id.ok_or(ApiError::MissingId("message"))?;
        let reply_id = inner.update_reply_id;
        for topic in inner.topics.values_mut() {
            if let Some(slot) = topic.messages.iter_mut().find(|m| m.id == Some(id)) {
                slot.content = message.content.clone();
                let mut reply = slot.clone();
                if let Some(other) = reply_id {
                    reply.id = Some(other);
                }
                return Ok(reply);
            }
        }
        Err(ApiError::Status(404))
    }

    async fn delete_message(&self, id: i64) -> ApiResult<()> {
        let mut inner = self.enter("delete_message")?;
        for topic in inner.topics.values_mut() {
            topic.messages.retain(|m| m.id != Some(id));
        }
        Ok(())
    }

    async fn list_users(&self) -> ApiResult<Vec<User>> {
        let inner = self.enter("list_users")?;
        Ok(inner.users.clone())
    }

    async fn create_user(&self, user: &User) -> ApiResult<User> {
        let mut inner = self.enter("create_user")?;
        if inner.users.iter().any(|u| u.username == user.username) {
            return Err(ApiError::Status(409));
        }
        inner.next_id += 1;
        let stored = User {
            id: Some(inner.next_id),
            ..user.without_password()
        };
        inner.users.push(stored.clone());
        Ok(stored)
    }

    async fn login(&self, credentials: &User) -> ApiResult<User> {
        let inner = self.enter("login")?;
        if credentials.password.as_deref() != Some("secret") {
            return Err(ApiError::Status(401));
        }
        inner
            .users
            .iter()
            .find(|u| u.username == credentials.username)
            .cloned()
            .ok_or(ApiError::Status(401))
    }

    async fn update_user(&self, id: i64, update: &UserUpdate) -> ApiResult<User> {
        let mut inner = self.enter("update_user")?;
        inner.last_user_update = Some(update.clone());
        let user = inner
            .users
            .iter_mut()
            .find(|u| u.id == Some(id))
            .ok_or(ApiError::Status(404))?;
        if let Some(name) = &update.username {
            user.username = name.clone();
        }
        user.admin = update.is_admin;
        Ok(user.clone())
    }

    async fn delete_user(&self, id: i64) -> ApiResult<()> {
        let mut inner = self.enter("delete_user")?;
        inner.users.retain(|u| u.id != Some(id));
        Ok(())
    }
}

/// Collects notices for assertions.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

#[allow(dead_code)]
impl RecordingNotifier {
    pub fn texts(&self) -> Vec<String> {
        self.notices.lock().unwrap().iter().map(|n| n.text.clone()).collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices
            .lock()
            .unwrap()
            .iter()
            .filter(|n| n.level == NoticeLevel::Error)
            .map(|n| n.text.clone())
            .collect()
    }

    pub fn last(&self) -> Option<String> {
        self.notices.lock().unwrap().last().map(|n| n.text.clone())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: &Notice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}

/// Answers every confirmation with a fixed value and counts prompts.
#[allow(dead_code)]
#[derive(Clone)]
pub struct ScriptedConfirm {
    answer: Arc<AtomicBool>,
    prompts: Arc<Mutex<Vec<ConfirmPrompt>>>,
}

#[allow(dead_code)]
impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self {
            answer: Arc::new(AtomicBool::new(answer)),
            prompts: Arc::default(),
        }
    }

    pub fn prompts(&self) -> Vec<ConfirmPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for ScriptedConfirm {
    async fn confirm(&self, prompt: &ConfirmPrompt) -> bool {
        self.prompts.lock().unwrap().push(prompt.clone());
        self.answer.load(Ordering::SeqCst)
    }
}

#[allow(dead_code)]
pub fn user(id: i64, name: &str, admin: bool) -> User {
    User {
        id: Some(id),
        username: name.to_string(),
        password: None,
        admin,
    }
}

#[allow(dead_code)]
pub fn message(id: i64, topic: i64, author: &User, content: &str) -> Message {
    Message {
        id: Some(id),
        content: content.to_string(),
        date: Utc.timestamp_millis_opt(1_700_000_000_000 + id).unwrap(),
        author: Some(author.clone()),
        topic: Some(TopicRef { id: topic }),
    }
}

#[allow(dead_code)]
pub fn topic(id: i64, title: &str, messages: Vec<Message>) -> Topic {
    Topic {
        id: Some(id),
        title: title.to_string(),
        date: Utc.timestamp_millis_opt(1_690_000_000_000).unwrap(),
        author: None,
        messages,
    }
}

/// Everything a view test needs, with the session file in a temp dir.
#[allow(dead_code)]
pub struct Harness {
    pub api: Arc<FakeApi>,
    pub state: Arc<AppState>,
    pub notifier: RecordingNotifier,
    pub confirm: ScriptedConfirm,
    _dir: tempfile::TempDir,
}

#[allow(dead_code)]
impl Harness {
    pub fn new(api: FakeApi, confirm_answer: bool) -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(dir.path().join("session.json"));
        Self {
            api: Arc::new(api),
            state: Arc::new(AppState::new(store)),
            notifier: RecordingNotifier::default(),
            confirm: ScriptedConfirm::answering(confirm_answer),
            _dir: dir,
        }
    }

    pub fn sign_in(&self, user: &User) {
        self.state.sign_in(user.clone()).expect("sign in");
    }

    pub fn ctx(&self) -> ViewContext<FakeApi, RecordingNotifier, ScriptedConfirm> {
        let mut ctx = ViewContext::new(
            self.api.clone(),
            self.state.clone(),
            self.notifier.clone(),
            self.confirm.clone(),
        );
        ctx.name_check_debounce = Duration::from_millis(5);
        ctx
    }
}
