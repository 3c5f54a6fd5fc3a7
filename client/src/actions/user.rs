use serde_json::Value;
use crate::actions::{apply_user_update, Action, ActionContext};
use crate::models::events::ClientEvent;

pub(super) struct UserUpdate;

impl Action for UserUpdate {
    fn handle(&mut self, cx: &mut ActionContext, data: &Value) -> Vec<ClientEvent> {
        match apply_user_update(cx, data) {
            Some(event) => vec![event],
            None => Vec::new(),
        }
    }
}
