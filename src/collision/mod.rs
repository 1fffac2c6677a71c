//! Synchronous dispatch of contact changes to per-body handlers.

use crate::physics::ContactEvent;
use crate::rapier::dynamics::RigidBodyHandle;
use crate::rapier::math::Real;
use std::collections::HashMap;
use strum_macros::Display;
use twister_api_types::DriverResult;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Display)]
pub enum EventKind {
    CollisionBegin,
    CollisionEnd,
}

/// A contact change seen from the point of view of a subscribed body.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct CollisionEvent {
    pub kind: EventKind,
    pub body: RigidBodyHandle,
    pub other: RigidBodyHandle,
    pub timestamp: Real,
}

pub trait CollisionHandler {
    fn handle(&mut self, event: &CollisionEvent) -> DriverResult<()>;
}

impl<F> CollisionHandler for F
where
    F: FnMut(&CollisionEvent) -> DriverResult<()>,
{
    fn handle(&mut self, event: &CollisionEvent) -> DriverResult<()> {
        self(event)
    }
}

struct Registration {
    body: RigidBodyHandle,
    handler: Box<dyn CollisionHandler>,
}

type BodyPair = (RigidBodyHandle, RigidBodyHandle);

fn body_pair(body1: RigidBodyHandle, body2: RigidBodyHandle) -> BodyPair {
    if body1.into_raw_parts() <= body2.into_raw_parts() {
        (body1, body2)
    } else {
        (body2, body1)
    }
}

/// Routes contact changes to the handlers registered for the bodies involved.
///
/// Contacts are tracked per body pair: a body pair touching through several colliders
/// is one contact, and a persisting contact never re-triggers `CollisionBegin`.
#[derive(Default)]
pub struct CollisionEventRouter {
    handlers: HashMap<EventKind, Vec<Registration>>,
    // Number of collider pairs currently touching, per body pair.
    contacts: HashMap<BodyPair, usize>,
}

impl CollisionEventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        kind: EventKind,
        body: RigidBodyHandle,
        handler: impl CollisionHandler + 'static,
    ) {
        self.handlers.entry(kind).or_default().push(Registration {
            body,
            handler: Box::new(handler),
        });
    }

    pub fn is_subscribed(&self, body: RigidBodyHandle) -> bool {
        self.handlers
            .values()
            .flatten()
            .any(|registration| registration.body == body)
    }

    pub fn num_active_contacts(&self) -> usize {
        self.contacts.len()
    }

    /// Dispatches one contact change reported by the engine. Returns the number of
    /// handlers invoked.
    pub fn dispatch(&mut self, event: &ContactEvent, timestamp: Real) -> usize {
        if event.started {
            self.on_collision_begin(event.body1, event.body2, timestamp)
        } else {
            self.on_collision_end(event.body1, event.body2, timestamp)
        }
    }

    pub fn on_collision_begin(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        timestamp: Real,
    ) -> usize {
        let touching = self.contacts.entry(body_pair(body1, body2)).or_insert(0);
        *touching += 1;

        if *touching == 1 {
            self.invoke(EventKind::CollisionBegin, body1, body2, timestamp)
        } else {
            0
        }
    }

    pub fn on_collision_end(
        &mut self,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        timestamp: Real,
    ) -> usize {
        let pair = body_pair(body1, body2);
        let Some(touching) = self.contacts.get_mut(&pair) else {
            return 0;
        };

        *touching -= 1;
        if *touching == 0 {
            self.contacts.remove(&pair);
            self.invoke(EventKind::CollisionEnd, body1, body2, timestamp)
        } else {
            0
        }
    }

    /// Drops every contact and handler involving a removed body.
    pub fn forget_body(&mut self, body: RigidBodyHandle) {
        self.contacts
            .retain(|(body1, body2), _| *body1 != body && *body2 != body);
        for registrations in self.handlers.values_mut() {
            registrations.retain(|registration| registration.body != body);
        }
    }

    fn invoke(
        &mut self,
        kind: EventKind,
        body1: RigidBodyHandle,
        body2: RigidBodyHandle,
        timestamp: Real,
    ) -> usize {
        let Some(registrations) = self.handlers.get_mut(&kind) else {
            return 0;
        };

        let mut invoked = 0;
        for registration in registrations.iter_mut() {
            let other = if registration.body == body1 {
                body2
            } else if registration.body == body2 {
                body1
            } else {
                continue;
            };

            let event = CollisionEvent {
                kind,
                body: registration.body,
                other,
                timestamp,
            };

            // Handlers only produce side effects: a failure is logged, never propagated.
            if let Err(err) = registration.handler.handle(&event) {
                log::warn!(
                    "{} handler of {:?} failed: {}",
                    kind,
                    registration.body,
                    err
                );
            }
            invoked += 1;
        }

        invoked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;
    use twister_api_types::DriverError;

    fn handle(id: u32) -> RigidBodyHandle {
        RigidBodyHandle::from_raw_parts(id, 0)
    }

    fn recorder(
        router: &mut CollisionEventRouter,
        kind: EventKind,
        body: RigidBodyHandle,
    ) -> Rc<RefCell<Vec<CollisionEvent>>> {
        let events = Rc::new(RefCell::new(vec![]));
        let recorded = events.clone();
        router.register(kind, body, move |event: &CollisionEvent| -> DriverResult<()> {
            recorded.borrow_mut().push(*event);
            Ok(())
        });
        events
    }

    #[test]
    fn persisting_contact_triggers_once() {
        let mut router = CollisionEventRouter::new();
        let cube = handle(1);
        let events = recorder(&mut router, EventKind::CollisionBegin, cube);

        assert_eq!(router.on_collision_begin(cube, handle(2), 0.0), 1);
        // The same body pair touching through a second collider.
        assert_eq!(router.on_collision_begin(handle(2), cube, 0.1), 0);
        assert_eq!(router.on_collision_end(cube, handle(2), 0.2), 0);
        assert_eq!(events.borrow().len(), 1);
        assert_eq!(router.num_active_contacts(), 1);
    }

    #[test]
    fn separation_then_recontact_triggers_again() {
        let mut router = CollisionEventRouter::new();
        let cube = handle(1);
        let floor = handle(2);
        let events = recorder(&mut router, EventKind::CollisionBegin, cube);

        let contacts = [
            ContactEvent {
                body1: cube,
                body2: floor,
                started: true,
            },
            ContactEvent {
                body1: floor,
                body2: cube,
                started: false,
            },
            ContactEvent {
                body1: cube,
                body2: floor,
                started: true,
            },
        ];
        let invoked: usize = contacts.iter().map(|c| router.dispatch(c, 1.0)).sum();

        assert_eq!(invoked, 2);
        let events = events.borrow();
        assert_eq!(events.len(), 2);
        assert!(events
            .iter()
            .all(|e| e.body == cube && e.other == floor && e.kind == EventKind::CollisionBegin));
    }

    #[test]
    fn each_subscriber_sees_itself_as_the_body() {
        let mut router = CollisionEventRouter::new();
        let a = recorder(&mut router, EventKind::CollisionBegin, handle(1));
        let b = recorder(&mut router, EventKind::CollisionBegin, handle(2));
        let bystander = recorder(&mut router, EventKind::CollisionBegin, handle(3));

        assert_eq!(router.on_collision_begin(handle(1), handle(2), 0.5), 2);
        assert_eq!(a.borrow()[0].other, handle(2));
        assert_eq!(b.borrow()[0].body, handle(2));
        assert_eq!(b.borrow()[0].other, handle(1));
        assert_eq!(b.borrow()[0].timestamp, 0.5);
        assert!(bystander.borrow().is_empty());
    }

    #[test]
    fn end_handlers_fire_on_full_separation() {
        let mut router = CollisionEventRouter::new();
        let ends = recorder(&mut router, EventKind::CollisionEnd, handle(1));

        router.on_collision_begin(handle(1), handle(2), 0.0);
        router.on_collision_begin(handle(1), handle(2), 0.0);
        router.on_collision_end(handle(1), handle(2), 0.1);
        assert!(ends.borrow().is_empty());
        router.on_collision_end(handle(2), handle(1), 0.2);
        assert_eq!(ends.borrow().len(), 1);
        assert_eq!(ends.borrow()[0].kind, EventKind::CollisionEnd);

        // Unknown pairs are ignored.
        assert_eq!(router.on_collision_end(handle(1), handle(2), 0.3), 0);
    }

    #[test]
    fn failing_handlers_do_not_stop_dispatch() {
        let mut router = CollisionEventRouter::new();
        router.register(
            EventKind::CollisionBegin,
            handle(1),
            |_: &CollisionEvent| -> DriverResult<()> {
                Err(DriverError::ResourceUnavailable("hit.mp3".to_string()))
            },
        );
        let events = recorder(&mut router, EventKind::CollisionBegin, handle(1));

        assert_eq!(router.on_collision_begin(handle(1), handle(2), 0.0), 2);
        assert_eq!(events.borrow().len(), 1);
    }

    #[test]
    fn forgotten_bodies_are_dropped() {
        let mut router = CollisionEventRouter::new();
        let events = recorder(&mut router, EventKind::CollisionBegin, handle(1));
        router.on_collision_begin(handle(1), handle(2), 0.0);
        assert!(router.is_subscribed(handle(1)));

        router.forget_body(handle(1));
        assert!(!router.is_subscribed(handle(1)));
        assert_eq!(router.num_active_contacts(), 0);
        assert_eq!(router.on_collision_begin(handle(1), handle(2), 1.0), 0);
        assert_eq!(events.borrow().len(), 1);
    }
}
