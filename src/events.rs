//! Typed event emitter scoped to one canvas session. Cross-component
//! signals go through this instead of ambient global listeners.

/// Handle returned by [`Emitter::subscribe`]; pass it back to
/// [`Emitter::unsubscribe`] to detach the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subscription(usize);

pub struct Emitter<E> {
    next_token: usize,
    listeners: Vec<(usize, Box<dyn FnMut(&E)>)>,
}

impl<E> Emitter<E> {
    pub fn new() -> Self {
        Self {
            next_token: 0,
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&E) + 'static) -> Subscription {
        let token = self.next_token;
        self.next_token += 1;
        self.listeners.push((token, Box::new(listener)));
        Subscription(token)
    }

    pub fn unsubscribe(&mut self, subscription: Subscription) {
        self.listeners.retain(|(token, _)| *token != subscription.0);
    }

    pub fn emit(&mut self, event: &E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> std::fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
