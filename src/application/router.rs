//! # Command Router
//!
//! Entry point for every inbound event. Form actions (`form_choice:`, `form_back:` and
//! free-text answers) drive the session's active form; everything else is resolved
//! through the route table. Matched requests pass the middleware pipeline, then the
//! handler, whose `DeferredRender` is validated and executed against the chat.

use anyhow::Result;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::application::context::{InboundEvent, InboundKind, RequestContext};
use crate::application::form_action::FormAction;
use crate::application::forms::{FormData, FormDescriptor, FormSlot, Transition};
use crate::application::middleware::{Middleware, Pipeline};
use crate::application::render::{self, DeferredRender, RenderIntent, RenderMode};
use crate::application::routes::RouteTable;
use crate::application::state::BotState;
use crate::domain::config::RouterConfig;
use crate::domain::error::RouterError;
use crate::domain::traits::ChatProvider;
use crate::domain::types::{FieldType, MessageId, View};

#[async_trait]
pub trait Handler: Send + Sync {
    fn name(&self) -> &str;

    async fn call(&self, ctx: RequestContext) -> Result<DeferredRender>;
}

pub type SharedHandler = Arc<dyn Handler>;

/// Adapter for async closures.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

pub fn handler_fn<F, Fut>(name: impl Into<String>, f: F) -> SharedHandler
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<DeferredRender>> + Send + 'static,
{
    Arc::new(FnHandler {
        name: name.into(),
        f,
    })
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<DeferredRender>> + Send,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, ctx: RequestContext) -> Result<DeferredRender> {
        (self.f)(ctx).await
    }
}

/// What a dispatch ended with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Rendered(MessageId),
    /// A stale or duplicate form action; nothing changed and nothing was drawn.
    Ignored,
}

enum Step {
    Done(Dispatch),
    Redirect { to: String, rendered: MessageId },
}

/// Collects routes and middleware at startup. The built router is immutable.
pub struct RouterBuilder {
    routes: RouteTable<SharedHandler>,
    pipeline: Pipeline,
    config: RouterConfig,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new(RouterConfig::default())
    }
}

impl RouterBuilder {
    pub fn new(config: RouterConfig) -> Self {
        Self {
            routes: RouteTable::new(),
            pipeline: Pipeline::new(),
            config,
        }
    }

    /// Registers a handler. Earlier registrations win when templates overlap.
    pub fn route(mut self, template: &str, handler: SharedHandler) -> Result<Self, RouterError> {
        self.routes.register(template, handler)?;
        Ok(self)
    }

    pub fn middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.pipeline.push(middleware);
        self
    }

    pub fn build(self) -> CommandRouter {
        tracing::info!(
            "Router ready: {} routes, {} middleware, form scope {:?}",
            self.routes.len(),
            self.pipeline.len(),
            self.config.form_scope
        );
        if self.routes.is_empty() {
            tracing::warn!("Router built without routes, every path will be unknown");
        }
        tracing::debug!("Routes: {}", self.routes.templates().collect::<Vec<_>>().join(", "));
        CommandRouter {
            routes: self.routes,
            pipeline: self.pipeline,
            state: Mutex::new(BotState::new(self.config.form_scope)),
            max_redirects: self.config.max_redirects,
        }
    }
}

pub struct CommandRouter {
    routes: RouteTable<SharedHandler>,
    pipeline: Pipeline,
    state: Mutex<BotState>,
    max_redirects: usize,
}

impl CommandRouter {
    /// Dispatches one inbound event and renders the result into `chat`.
    pub async fn handle(
        &self,
        chat: &dyn ChatProvider,
        mut event: InboundEvent,
    ) -> Result<Dispatch, RouterError> {
        let mut redirects = 0;
        loop {
            match self.dispatch_once(chat, &event).await? {
                Step::Done(outcome) => return Ok(outcome),
                Step::Redirect { to, rendered } => {
                    redirects += 1;
                    if redirects > self.max_redirects {
                        tracing::error!("Redirect chain from {} exceeded {}", event.text, self.max_redirects);
                        return Err(RouterError::RedirectLimit(self.max_redirects));
                    }
                    tracing::debug!("Redirecting {} -> {}", event.text, to);
                    event = event.redirected(&to, rendered);
                }
            }
        }
    }

    /// Snapshot of the session's active form.
    #[allow(dead_code)]
    pub async fn current_form(&self, session_id: &str) -> FormSlot<FormDescriptor> {
        self.state.lock().await.current_form(session_id).cloned()
    }

    async fn dispatch_once(
        &self,
        chat: &dyn ChatProvider,
        event: &InboundEvent,
    ) -> Result<Step, RouterError> {
        let path = event.text.trim();

        if let Some(action) = self.decode_form_action(event, path).await? {
            return self.handle_form_action(chat, event, action).await;
        }

        let (ctx, handler) = self.resolve(event, path, None)?;
        self.invoke(chat, ctx, handler).await
    }

    /// Reserved prefixes always decode as form actions. Free text counts as one only
    /// while the session's form awaits a text field.
    async fn decode_form_action(
        &self,
        event: &InboundEvent,
        path: &str,
    ) -> Result<Option<FormAction>, RouterError> {
        if let Some(decoded) = FormAction::decode(path) {
            return decoded.map(Some);
        }
        if event.kind != InboundKind::Text || path.starts_with('/') {
            return Ok(None);
        }
        let state = self.state.lock().await;
        let awaiting_text = match state.current_form(&event.session_id) {
            FormSlot::Active(form) => form
                .current_field()
                .is_some_and(|f| f.field_type == FieldType::Text),
            FormSlot::Empty => false,
        };
        Ok(awaiting_text.then(|| FormAction::Text {
            value: path.to_string(),
        }))
    }

    async fn handle_form_action(
        &self,
        chat: &dyn ChatProvider,
        event: &InboundEvent,
        action: FormAction,
    ) -> Result<Step, RouterError> {
        let (transition, completion_route) = {
            let mut state = self.state.lock().await;
            let form = state
                .current_form_mut(&event.session_id)
                .require(&event.session_id)?;
            let transition = match &action {
                FormAction::Choice { step, value } => form.submit(*step, value),
                FormAction::Back { step } => form.navigate_back(*step),
                FormAction::Text { value } => match form.step() {
                    Some(step) => form.submit(step, value),
                    None => Transition::Ignored,
                },
            };
            (transition, form.completion_route.clone())
        };

        match transition {
            Transition::Ignored => {
                tracing::debug!("Ignoring form action {:?} in session {}", action, event.session_id);
                Ok(Step::Done(Dispatch::Ignored))
            }
            Transition::Advanced { step } | Transition::Moved { step } => {
                let mode = self.step_render_mode(event, step).await;
                let id = self.render_form_step(chat, event, &mode).await?;
                Ok(Step::Done(Dispatch::Rendered(id)))
            }
            Transition::Completed(data) => {
                tracing::info!(
                    "Form completed in session {}, handing {} values to {}",
                    event.session_id,
                    data.len(),
                    completion_route
                );
                let (ctx, handler) = self.resolve(event, &completion_route, Some(data))?;
                self.invoke(chat, ctx, handler).await
            }
        }
    }

    fn resolve(
        &self,
        event: &InboundEvent,
        path: &str,
        form_data: Option<FormData>,
    ) -> Result<(RequestContext, SharedHandler), RouterError> {
        let matched = self.routes.lookup(path).inspect_err(|_| {
            tracing::warn!("No route for '{}' (user {})", path, event.user_id);
        })?;
        let ctx = RequestContext::new(event.clone(), path, matched.template, matched.params);
        let ctx = match form_data {
            Some(data) => ctx.with_form_data(data),
            None => ctx,
        };
        Ok((ctx, matched.handler.clone()))
    }

    async fn invoke(
        &self,
        chat: &dyn ChatProvider,
        ctx: RequestContext,
        handler: SharedHandler,
    ) -> Result<Step, RouterError> {
        self.pipeline.run(&ctx).await;

        tracing::info!("Calling {} for {}", handler.name(), ctx.path());
        let render = handler.call(ctx.clone()).await.map_err(|e| {
            tracing::error!("Route execution failed in {}: {:#}", handler.name(), e);
            RouterError::dispatch_failure(handler.name(), e)
        })?;

        if let Err(reason) = render.validate() {
            tracing::error!("Handler {} returned an unusable render: {}", handler.name(), reason);
            return Err(RouterError::ProtocolViolation {
                handler: handler.name().to_string(),
                reason,
            });
        }

        let rendered = self.execute(chat, ctx.event(), render.clone()).await?;
        Ok(match render.redirect {
            Some(to) => Step::Redirect { to, rendered },
            None => Step::Done(Dispatch::Rendered(rendered)),
        })
    }

    async fn execute(
        &self,
        chat: &dyn ChatProvider,
        event: &InboundEvent,
        render: DeferredRender,
    ) -> Result<MessageId, RouterError> {
        match render.intent {
            RenderIntent::Form(form) => {
                self.state.lock().await.start_form(&event.session_id, form);
                self.render_form_step(chat, event, &render.mode).await
            }
            _ => {
                let view = render.to_view().unwrap_or_default();
                render::deliver(chat, event, &view, &render.mode).await
            }
        }
    }

    /// After a text answer the form message is the one shown for the previous step;
    /// button presses carry their own message and use `Auto`.
    async fn step_render_mode(&self, event: &InboundEvent, step: usize) -> RenderMode {
        if event.kind == InboundKind::Callback {
            return RenderMode::Auto;
        }
        let state = self.state.lock().await;
        let previous = match state.current_form(&event.session_id) {
            FormSlot::Active(form) => step
                .checked_sub(1)
                .and_then(|p| form.fields().get(p))
                .and_then(|f| f.message_id.clone()),
            FormSlot::Empty => None,
        };
        previous.map(RenderMode::Edit).unwrap_or(RenderMode::New)
    }

    async fn render_form_step(
        &self,
        chat: &dyn ChatProvider,
        event: &InboundEvent,
        mode: &RenderMode,
    ) -> Result<MessageId, RouterError> {
        let (view, step) = {
            let state = self.state.lock().await;
            let form = state.current_form(&event.session_id).require(&event.session_id)?;
            let form_view = form.view();
            let step = form_view.step;
            let view = View {
                form: Some(form_view),
                ..View::new(form.title.clone(), form.text.clone())
            };
            (view, step)
        };

        let id = render::deliver(chat, event, &view, mode).await?;

        if let FormSlot::Active(form) = self.state.lock().await.current_form_mut(&event.session_id) {
            form.set_message_id(step, id.clone());
        }
        Ok(id)
    }
}
