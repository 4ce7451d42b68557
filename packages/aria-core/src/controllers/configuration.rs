//! Configuration controller.
//!
//! A single `QX` request walks every controller's configuration synthesis in
//! a fixed order - Favorites, Sources, EqualizerPresets, FrontPanel,
//! Infrared, Network (restricted), Zones, Groups - and concatenates the
//! serialized forms into one response. The walk itself lives on the
//! controller set, which owns the other controllers; this controller carries
//! the request registration and the forward-as-observation fallback used
//! before the first refresh completes.

use crate::client::{BundlePart, ClientCommandManager, ResponseMatcher};
use crate::controllers::basis::ControllerBasis;
use crate::controllers::routes::{NotificationRoute, RequestRoute};
use crate::protocol::framing::Record;
use crate::protocol::vocabulary::{
    configuration as vocab, equalizer_presets, favorites, front_panel, infrared, network, sources,
    zones,
};
use crate::server::{ConnectionId, ServerCommandManager};

/// Every record form a forwarded configuration dump may contain.
///
/// `EQB` routes to the zones controller here: preset and zone bands share
/// the form, and the zone section follows the preset section in dump order,
/// so zone state ends up correct while preset bands wait for their own
/// refresh queries.
static CONFIGURATION_PARTS: &[BundlePart] = &[
    BundlePart {
        pattern: &favorites::NAME_RESPONSE,
        route: NotificationRoute::FavoriteName,
    },
    BundlePart {
        pattern: &sources::NAME_RESPONSE,
        route: NotificationRoute::SourceName,
    },
    BundlePart {
        pattern: &equalizer_presets::NAME_RESPONSE,
        route: NotificationRoute::PresetName,
    },
    BundlePart {
        pattern: &front_panel::BRIGHTNESS_RESPONSE,
        route: NotificationRoute::FrontPanelBrightness,
    },
    BundlePart {
        pattern: &front_panel::LOCKED_RESPONSE,
        route: NotificationRoute::FrontPanelLocked,
    },
    BundlePart {
        pattern: &infrared::DISABLED_RESPONSE,
        route: NotificationRoute::InfraredDisabled,
    },
    BundlePart {
        pattern: &network::DHCP_RESPONSE,
        route: NotificationRoute::NetworkDhcp,
    },
    BundlePart {
        pattern: &network::ADDRESS_RESPONSE,
        route: NotificationRoute::NetworkAddress,
    },
    BundlePart {
        pattern: &network::NETMASK_RESPONSE,
        route: NotificationRoute::NetworkNetmask,
    },
    BundlePart {
        pattern: &network::GATEWAY_RESPONSE,
        route: NotificationRoute::NetworkGateway,
    },
    BundlePart {
        pattern: &network::MAC_RESPONSE,
        route: NotificationRoute::NetworkMac,
    },
    BundlePart {
        pattern: &network::SDDP_RESPONSE,
        route: NotificationRoute::NetworkSddp,
    },
    BundlePart {
        pattern: &zones::NAME_RESPONSE,
        route: NotificationRoute::ZoneName,
    },
    BundlePart {
        pattern: &zones::SOURCE_RESPONSE,
        route: NotificationRoute::ZoneSource,
    },
    BundlePart {
        pattern: &zones::VOLUME_RESPONSE,
        route: NotificationRoute::ZoneVolume,
    },
    BundlePart {
        pattern: &zones::VOLUME_FIXED_RESPONSE,
        route: NotificationRoute::ZoneVolumeFixed,
    },
    BundlePart {
        pattern: &zones::MUTE_RESPONSE,
        route: NotificationRoute::ZoneMute,
    },
    BundlePart {
        pattern: &zones::SOUND_MODE_RESPONSE,
        route: NotificationRoute::ZoneSoundMode,
    },
    BundlePart {
        pattern: &zones::EQUALIZER_BAND_RESPONSE,
        route: NotificationRoute::ZoneEqualizerBand,
    },
    BundlePart {
        pattern: &zones::EQUALIZER_PRESET_RESPONSE,
        route: NotificationRoute::ZoneEqualizerPreset,
    },
    BundlePart {
        pattern: &zones::TONE_RESPONSE,
        route: NotificationRoute::ZoneTone,
    },
    BundlePart {
        pattern: &zones::HIGHPASS_RESPONSE,
        route: NotificationRoute::ZoneHighpass,
    },
    BundlePart {
        pattern: &zones::LOWPASS_RESPONSE,
        route: NotificationRoute::ZoneLowpass,
    },
    BundlePart {
        pattern: &zones::BALANCE_RESPONSE,
        route: NotificationRoute::ZoneBalance,
    },
];

/// Controller for the configuration dump.
pub struct ConfigurationController {
    basis: ControllerBasis,
}

impl ConfigurationController {
    pub fn new(basis: ControllerBasis) -> Self {
        Self { basis }
    }

    pub fn register(server: &mut ServerCommandManager) {
        server.register_request(&vocab::QUERY_REQUEST, RequestRoute::ConfigurationQuery);
    }

    /// Forwards `QX` upstream when local synthesis is not yet possible.
    pub fn forward(
        &self,
        client: &mut ClientCommandManager,
        origin: ConnectionId,
        record: &Record,
    ) {
        self.basis.proxy_observation(
            client,
            origin,
            record.clone(),
            ResponseMatcher::Bundle {
                parts: CONFIGURATION_PARTS,
                terminator: &vocab::QUERY_REQUEST,
            },
            RequestRoute::ConfigurationQuery,
            None,
        );
    }
}
