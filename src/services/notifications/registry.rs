use crate::models::Channel;
use crate::services::notifications::NotificationChannel;

/// Fixed fallback priority after the preferred channel.
pub const FALLBACK_ORDER: [Channel; 3] = [Channel::WhatsApp, Channel::Sms, Channel::Email];

/// Closed set of channel strategies, selected by lookup rather than
/// inheritance.
pub struct ChannelRegistry {
    channels: Vec<Box<dyn NotificationChannel>>,
}

impl ChannelRegistry {
    pub fn new(channels: Vec<Box<dyn NotificationChannel>>) -> Self {
        Self { channels }
    }

    pub fn get(&self, channel: Channel) -> Option<&dyn NotificationChannel> {
        self.channels
            .iter()
            .find(|c| c.channel() == channel)
            .map(|c| c.as_ref())
    }

    /// Attempt order for one delivery: the preferred channel first, then the
    /// fixed fallback order, duplicates skipped. Built once per call.
    pub fn ordered_for(&self, preferred: Channel) -> Vec<&dyn NotificationChannel> {
        let mut order = vec![];
        if let Some(primary) = self.get(preferred) {
            order.push(primary);
        }
        for channel in FALLBACK_ORDER {
            if channel == preferred {
                continue;
            }
            if let Some(strategy) = self.get(channel) {
                order.push(strategy);
            }
        }
        order
    }
}
