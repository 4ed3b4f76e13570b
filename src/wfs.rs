//! Waveform stream reception and channel synchronization.
//!
//! With streaming enabled, the ADE9178 pushes one 32-bit word per enabled channel and
//! sample over the waveform UART: 24 bits of sample data in the upper bytes and the
//! channel id in the lowest byte. Enabled channels appear in a fixed cyclic order,
//! lowest id first. The stream is asynchronous, so a received buffer neither starts
//! at a sample boundary nor at any particular channel; [`Ade9178::find_channel_offset`]
//! recovers the byte offset where decoding can safely begin for a given channel.

use super::*;

/// Bytes per streamed sample word.
const SAMPLE_BYTES: usize = 4;

/// Consecutive correctly ordered rotations required before the stream is considered
/// aligned.
const SYNC_WINDOW_COUNT: u32 = 8;

/// Waveform stream state kept on the device handle.
pub(crate) struct WfsState {
    config: WfsConfig,
    /// Enabled channel ids in stream order, lowest id first.
    rotation: [u8; MAX_NUM_CHANNELS],
    num_enabled: usize,
    window_count: u32,
}

impl Default for WfsState {
    fn default() -> Self {
        Self {
            config: WfsConfig::default(),
            rotation: [0; MAX_NUM_CHANNELS],
            num_enabled: 0,
            window_count: SYNC_WINDOW_COUNT,
        }
    }
}

impl<'a, T: Transport> Ade9178<'a, T> {
    /// Applies a waveform stream configuration, given the raw WFS_CONFIG register
    /// word the application wrote to the device. The enabled-channel rotation is
    /// derived from the channel mask, and the waveform UART is switched to the
    /// configured baud rate when streaming is enabled with at least one channel.
    /// # Arguments
    /// * `raw_config` - The WFS_CONFIG register value, decoded as a [`WfsConfig`].
    pub fn configure_wfs(&mut self, raw_config: u32) -> Result<(), Error<T::Error>> {
        let config = WfsConfig::from(raw_config);
        self.wfs.config = config;
        self.wfs.num_enabled = 0;
        for id in 0..MAX_NUM_CHANNELS {
            if config.channel_select & (1 << id) != 0 {
                self.wfs.rotation[self.wfs.num_enabled] = id as u8;
                self.wfs.num_enabled += 1;
            }
        }
        if config.enable && config.channel_select != 0 {
            let rate = config.baud_rate.bps();
            self.transport_mut()
                .set_baud_rate(rate)
                .map_err(Error::WfsBaudRate)?;
        }
        Ok(())
    }

    /// Starts receiving waveform bytes into `samples`. Completion is reported through
    /// [`Sideband::on_wfs_rx_complete`] and can be polled with
    /// [`Self::wfs_rx_complete`]. Refuses while streaming is disabled or a previous
    /// receive is still outstanding.
    /// # Arguments
    /// * `samples` - Receive buffer; must stay valid until the completion event.
    pub fn start_wfs_receive(&mut self, samples: &mut [u8]) -> Result<(), Error<T::Error>> {
        if !self.wfs.config.enable {
            return Err(Error::WfsDisabled);
        }
        if !self.sideband().wfs_rx_done() {
            return Err(Error::WfsBusy);
        }
        self.sideband().start_wfs_rx();
        self.transport_mut()
            .wfs_receive(samples)
            .map_err(Error::WfsComm)
    }

    /// Returns `true` once the waveform receive started by
    /// [`Self::start_wfs_receive`] has completed.
    pub fn wfs_rx_complete(&self) -> bool {
        self.sideband().wfs_rx_done()
    }

    /// Finds the byte offset of the first sample of `channel_id` inside `samples`.
    ///
    /// A sliding window starts at byte offset 0 and reads one channel tag per enabled
    /// channel, each one sample word apart, expecting the enabled-channel rotation
    /// beginning at `channel_id`. A fully matching window counts towards the
    /// confidence threshold and the window advances by a whole rotation; any mismatch
    /// slides the window by a single byte and resets the count, which also recovers
    /// streams that do not start on a sample boundary. Once enough consecutive
    /// windows match, the offset where the first of them began is returned.
    ///
    /// Requires a prior [`Self::configure_wfs`] with a non-empty channel mask;
    /// otherwise, or when the buffer runs out before the rotation stabilizes, the
    /// result is [`Error::NoValidSamples`].
    /// # Arguments
    /// * `samples` - Received stream bytes.
    /// * `channel_id` - Channel whose first sample to locate.
    pub fn find_channel_offset(
        &self,
        samples: &[u8],
        channel_id: u8,
    ) -> Result<usize, Error<T::Error>> {
        let num_enabled = self.wfs.num_enabled;
        if num_enabled == 0 {
            return Err(Error::NoValidSamples);
        }
        let rotation = &self.wfs.rotation[..num_enabled];
        let window = num_enabled * SAMPLE_BYTES;
        let mut good_windows = 0;
        let mut pos = 0;
        let mut offset = 0;
        while samples.len() - pos >= window {
            if rotation_matches(&samples[pos..], rotation, channel_id) {
                good_windows += 1;
                if good_windows >= self.wfs.window_count {
                    return Ok(offset);
                }
                pos += window;
            } else {
                pos += 1;
                good_windows = 0;
                offset = pos;
            }
        }
        Err(Error::NoValidSamples)
    }
}

/// Checks one window of channel tags against the expected rotation starting at
/// `start`, one tag per sample word.
fn rotation_matches(buf: &[u8], rotation: &[u8], start: u8) -> bool {
    let mut expected = start;
    for slot in 0..rotation.len() {
        if buf[slot * SAMPLE_BYTES] != expected {
            return false;
        }
        expected = next_channel_id(rotation, expected);
    }
    true
}

/// Returns the successor of `channel_id` in the enabled-channel rotation, wrapping
/// around. An id outside the rotation is returned unchanged.
fn next_channel_id(rotation: &[u8], channel_id: u8) -> u8 {
    for (slot, &id) in rotation.iter().enumerate() {
        if id == channel_id {
            return rotation[(slot + 1) % rotation.len()];
        }
    }
    channel_id
}
