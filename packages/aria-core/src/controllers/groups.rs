//! Groups controller.
//!
//! Groups are stateless aggregates held entirely in the proxy: membership
//! and name mutations act on local state and are answered without upstream
//! traffic. Volume, mute, and source requests are broadcast intents: the
//! controller validates, echoes the request to the originator, and hands the
//! intent to the engine, which lets the Zones controller translate it into
//! per-member zone mutations.

use regex::Captures;

use crate::controllers::basis::ObjectController;
use crate::controllers::routes::RequestRoute;
use crate::controllers::EngineContext;
use crate::error::{ProxyError, ProxyResult};
use crate::events::{GroupEvent, GroupIntent};
use crate::model::types::{Name, VolumeLevel, GROUP_IDENTIFIERS, SOURCE_IDENTIFIERS};
use crate::model::GroupModel;
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{capture_i16, capture_str, capture_u32, groups as vocab};
use crate::server::{ConnectionId, ServerCommandManager};

/// A validated broadcast intent, ready for the Zones controller.
#[derive(Debug)]
pub struct PendingIntent {
    pub group: u8,
    pub members: Vec<u8>,
    pub intent: GroupIntent,
}

/// Controller for the group object family.
pub struct GroupsController {
    groups: Vec<GroupModel>,
}

impl GroupsController {
    pub fn new() -> Self {
        Self {
            groups: GROUP_IDENTIFIERS.iter().map(GroupModel::new).collect(),
        }
    }

    /// Registers this controller's request patterns. Groups register no
    /// upstream notification patterns; the device knows nothing about them.
    pub fn register(server: &mut ServerCommandManager) {
        use RequestRoute as R;
        let requests: &[(&'static crate::protocol::Pattern, R)] = &[
            (&vocab::QUERY_REQUEST, R::GroupQuery),
            (&vocab::SET_NAME_REQUEST, R::GroupSetName),
            (&vocab::ADD_ZONE_REQUEST, R::GroupAddZone),
            (&vocab::REMOVE_ZONE_REQUEST, R::GroupRemoveZone),
            (&vocab::CLEAR_ZONES_REQUEST, R::GroupClearZones),
            (&vocab::SET_VOLUME_REQUEST, R::GroupSetVolume),
            (&vocab::VOLUME_UP_REQUEST, R::GroupVolumeUp),
            (&vocab::VOLUME_DOWN_REQUEST, R::GroupVolumeDown),
            (&vocab::SET_MUTE_REQUEST, R::GroupSetMute),
            (&vocab::TOGGLE_MUTE_REQUEST, R::GroupToggleMute),
            (&vocab::SET_SOURCE_REQUEST, R::GroupSetSource),
        ];
        for (pattern, route) in requests.iter().copied() {
            server.register_request(pattern, route);
        }
    }

    fn validate_group(&self, raw: u32) -> ProxyResult<u8> {
        Ok(GROUP_IDENTIFIERS.validate(raw)?)
    }

    fn group(&self, group: u8) -> &GroupModel {
        &self.groups[usize::from(group) - 1]
    }

    fn group_mut(&mut self, group: u8) -> &mut GroupModel {
        &mut self.groups[usize::from(group) - 1]
    }

    /// Test hook: immutable access by identifier.
    pub fn model(&self, group: u8) -> ProxyResult<&GroupModel> {
        let group = GROUP_IDENTIFIERS.validate(u32::from(group))?;
        Ok(self.group(group))
    }

    /// Replies to the originator and, when the mutation changed local
    /// state, repeats the response to every other connection.
    fn reply(
        &self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        response: Record,
        changed: bool,
    ) {
        ctx.server.send_record(origin, &response);
        if changed {
            ctx.server.broadcast_except(Some(origin), &response);
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Local mutations
    // ─────────────────────────────────────────────────────────────────────

    pub fn on_query(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
        record: &Record,
    ) -> ProxyResult<()> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let model = self.group(group);
        let mut records = vec![vocab::name_response(group, model.name())];
        for zone in model.members() {
            records.push(vocab::add_zone_response(group, zone));
        }
        records.push(record.clone());
        ctx.server.send_records(origin, &records);
        Ok(())
    }

    pub fn on_set_name(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<()> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let name = Name::new(capture_str(captures, 2)?)?;
        let change = self.group_mut(group).set_name(name.clone());
        if change.is_changed() {
            ctx.emitter.emit(
                GroupEvent::NameChanged {
                    group,
                    name: name.to_string(),
                }
                .into(),
            );
        }
        self.reply(
            ctx,
            origin,
            vocab::name_response(group, self.group(group).name()),
            change.is_changed(),
        );
        Ok(())
    }

    pub fn on_add_zone(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<()> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let zone = capture_u32(captures, 2)?;
        let zone = u8::try_from(zone).map_err(|_| ProxyError::OutOfRange("zone identifier"))?;
        let change = self.group_mut(group).add_zone(zone)?;
        self.emit_members(ctx, group, change.is_changed());
        self.reply(ctx, origin, vocab::add_zone_response(group, zone), change.is_changed());
        Ok(())
    }

    pub fn on_remove_zone(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<()> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let zone = capture_u32(captures, 2)?;
        let zone = u8::try_from(zone).map_err(|_| ProxyError::OutOfRange("zone identifier"))?;
        let change = self.group_mut(group).remove_zone(zone)?;
        self.emit_members(ctx, group, change.is_changed());
        self.reply(
            ctx,
            origin,
            vocab::remove_zone_response(group, zone),
            change.is_changed(),
        );
        Ok(())
    }

    pub fn on_clear_zones(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<()> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let change = self.group_mut(group).clear_zones();
        self.emit_members(ctx, group, change.is_changed());
        self.reply(ctx, origin, vocab::clear_zones_response(group), change.is_changed());
        Ok(())
    }

    fn emit_members(&self, ctx: &mut EngineContext<'_>, group: u8, changed: bool) {
        if changed {
            ctx.emitter.emit(
                GroupEvent::MembersChanged {
                    group,
                    members: self.group(group).members().collect(),
                }
                .into(),
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────
    // Broadcast intents
    // ─────────────────────────────────────────────────────────────────────

    /// Validates an intent request, echoes it to the originator, and
    /// returns the intent for the engine to hand to the Zones controller.
    fn intend(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        group: u8,
        response: Record,
        intent: GroupIntent,
    ) -> ProxyResult<Option<PendingIntent>> {
        let members: Vec<u8> = self.group(group).members().collect();
        ctx.server.send_record(origin, &response);
        ctx.emitter.emit(
            GroupEvent::Intent {
                group,
                members: members.clone(),
                intent,
            }
            .into(),
        );
        Ok(Some(PendingIntent {
            group,
            members,
            intent,
        }))
    }

    pub fn on_set_volume(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<Option<PendingIntent>> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let volume = VolumeLevel::new(capture_i16(captures, 2)?)?;
        self.group_mut(group).set_volume(volume);
        self.intend(
            ctx,
            origin,
            group,
            vocab::set_volume_response(group, volume),
            GroupIntent::SetVolume {
                level: volume.get(),
            },
        )
    }

    pub fn on_volume_up(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<Option<PendingIntent>> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        self.intend(
            ctx,
            origin,
            group,
            vocab::volume_up_response(group),
            GroupIntent::VolumeUp,
        )
    }

    pub fn on_volume_down(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<Option<PendingIntent>> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        self.intend(
            ctx,
            origin,
            group,
            vocab::volume_down_response(group),
            GroupIntent::VolumeDown,
        )
    }

    pub fn on_set_mute(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<Option<PendingIntent>> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let muted = match capture_str(captures, 2)? {
            "M" => true,
            "U" => false,
            other => {
                return Err(ProxyError::BadCommand(format!(
                    "unparsable mute state `{other}`"
                )))
            }
        };
        self.group_mut(group).set_mute(muted);
        self.intend(
            ctx,
            origin,
            group,
            vocab::set_mute_response(group, muted),
            GroupIntent::SetMute { muted },
        )
    }

    pub fn on_toggle_mute(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<Option<PendingIntent>> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        self.intend(
            ctx,
            origin,
            group,
            vocab::toggle_mute_response(group),
            GroupIntent::ToggleMute,
        )
    }

    pub fn on_set_source(
        &mut self,
        ctx: &mut EngineContext<'_>,
        origin: ConnectionId,
        captures: &Captures<'_>,
    ) -> ProxyResult<Option<PendingIntent>> {
        let group = self.validate_group(capture_u32(captures, 1)?)?;
        let source = SOURCE_IDENTIFIERS.validate(capture_u32(captures, 2)?)?;
        self.group_mut(group).set_source(source)?;
        self.intend(
            ctx,
            origin,
            group,
            vocab::set_source_response(group, source),
            GroupIntent::SetSource { source },
        )
    }
}

impl Default for GroupsController {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectController for GroupsController {
    fn query_current_configuration(&self, buffer: &mut Vec<Record>) -> ProxyResult<()> {
        for model in &self.groups {
            buffer.push(vocab::name_response(model.identifier(), model.name()));
            for zone in model.members() {
                buffer.push(vocab::add_zone_response(model.identifier(), zone));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientCommandManager;
    use crate::events::NoopEventEmitter;
    use crate::server::ServerCommandManager;
    use tokio::sync::mpsc;

    fn harness() -> (GroupsController, ClientCommandManager, ServerCommandManager) {
        (
            GroupsController::new(),
            ClientCommandManager::new(),
            ServerCommandManager::new(),
        )
    }

    #[tokio::test]
    async fn membership_mutations_are_local_only() {
        let (mut groups, mut client, mut server) = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };

        let captures = vocab::ADD_ZONE_REQUEST.matches("GA2,3").unwrap();
        groups.on_add_zone(&mut ctx, 1, &captures).unwrap();

        // No upstream traffic; local reply only.
        assert_eq!(client.pending_exchanges(), 0);
        let bytes = rx.try_recv().unwrap();
        assert_eq!(&bytes[..], b"(GRA2,3)\r\n");
        assert!(groups.model(2).unwrap().contains(3));
    }

    #[tokio::test]
    async fn removing_a_non_member_is_an_error() {
        let (mut groups, mut client, mut server) = harness();
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        let captures = vocab::REMOVE_ZONE_REQUEST.matches("GR2,9").unwrap();
        let result = groups.on_remove_zone(&mut ctx, 1, &captures);
        assert!(matches!(result, Err(ProxyError::NotFound(_))));
    }

    #[tokio::test]
    async fn volume_request_echoes_and_yields_an_intent() {
        let (mut groups, mut client, mut server) = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        {
            let mut ctx = EngineContext {
                client: &mut client,
                server: &mut server,
                emitter: &NoopEventEmitter,
            };
            for body in ["GA2,1", "GA2,2", "GA2,3"] {
                let captures = vocab::ADD_ZONE_REQUEST.matches(body).unwrap();
                groups.on_add_zone(&mut ctx, 1, &captures).unwrap();
            }

            let captures = vocab::SET_VOLUME_REQUEST.matches("VG2,-10").unwrap();
            let intent = groups.on_set_volume(&mut ctx, 1, &captures).unwrap().unwrap();
            assert_eq!(intent.group, 2);
            assert_eq!(intent.members, vec![1, 2, 3]);
            assert_eq!(intent.intent, GroupIntent::SetVolume { level: -10 });
        }

        // Originator got membership echoes plus the volume acknowledgment.
        let mut text = String::new();
        while let Ok(bytes) = rx.try_recv() {
            text.push_str(std::str::from_utf8(&bytes).unwrap());
        }
        assert!(text.ends_with("(VG2,-10)\r\n"));
    }

    #[tokio::test]
    async fn query_synthesizes_name_members_and_terminator() {
        let (mut groups, mut client, mut server) = harness();
        let (tx, mut rx) = mpsc::unbounded_channel();
        server.connection_opened(1, tx);
        let mut ctx = EngineContext {
            client: &mut client,
            server: &mut server,
            emitter: &NoopEventEmitter,
        };
        let captures = vocab::ADD_ZONE_REQUEST.matches("GA1,4").unwrap();
        groups.on_add_zone(&mut ctx, 1, &captures).unwrap();
        let _ = rx.try_recv();

        let captures = vocab::QUERY_REQUEST.matches("QG1").unwrap();
        groups
            .on_query(&mut ctx, 1, &captures, &Record::from("QG1"))
            .unwrap();
        let bytes = rx.try_recv().unwrap();
        assert_eq!(
            std::str::from_utf8(&bytes).unwrap(),
            "(NG1,Group 1)\r\n(GRA1,4)\r\n(QG1)\r\n"
        );
    }
}
