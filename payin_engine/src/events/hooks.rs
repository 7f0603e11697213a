use std::{future::Future, pin::Pin, sync::Arc};

use crate::events::{CaptureCompletedEvent, CaptureFailedEvent, EventHandler, EventProducer, Handler};

#[derive(Default, Clone)]
pub struct EventProducers {
    pub capture_completed_producer: Vec<EventProducer<CaptureCompletedEvent>>,
    pub capture_failed_producer: Vec<EventProducer<CaptureFailedEvent>>,
}

pub struct EventHandlers {
    pub on_capture_completed: Option<EventHandler<CaptureCompletedEvent>>,
    pub on_capture_failed: Option<EventHandler<CaptureFailedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_capture_completed = hooks.on_capture_completed.map(|f| EventHandler::new(buffer_size, f));
        let on_capture_failed = hooks.on_capture_failed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_capture_completed, on_capture_failed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_capture_completed {
            result.capture_completed_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_capture_failed {
            result.capture_failed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_capture_completed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
        if let Some(handler) = self.on_capture_failed {
            tokio::spawn(async move {
                handler.start_handler().await;
            });
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_capture_completed: Option<Handler<CaptureCompletedEvent>>,
    pub on_capture_failed: Option<Handler<CaptureFailedEvent>>,
}

impl EventHooks {
    pub fn on_capture_completed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CaptureCompletedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_capture_completed = Some(Arc::new(f));
        self
    }

    pub fn on_capture_failed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(CaptureFailedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_capture_failed = Some(Arc::new(f));
        self
    }
}
