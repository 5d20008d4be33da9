//! Encoding functions for the RealFlight Link request bodies.

use std::fmt::Write;

use crate::ChannelVector;

const CONTROL_INPUTS_CAPACITY: usize = 291;

/// Mask selecting all 12 channels.
const SELECTED_CHANNELS: u32 = 4095;

/// Encodes a channel vector as the `pControlInputs` body of an ExchangeData request.
pub(crate) fn encode_channel_vector(vector: &ChannelVector) -> String {
    let mut message = String::with_capacity(CONTROL_INPUTS_CAPACITY);

    message.push_str("<pControlInputs>");
    let _ = write!(
        message,
        "<m-selectedChannels>{}</m-selectedChannels>",
        SELECTED_CHANNELS
    );
    message.push_str("<m-channelValues-0to1>");
    for value in vector.channels.iter() {
        let _ = write!(message, "<item>{}</item>", value);
    }
    message.push_str("</m-channelValues-0to1>");
    message.push_str("</pControlInputs>");

    message
}
