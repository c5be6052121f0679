//! Block aggregation for Chat Analyzer.
//!
//! Merges consecutive messages from the same sender into [`Block`]s when
//! they follow each other within the merge window.

use chat_core::models::{Block, Message};
use chat_core::settings::PipelineConfig;
use chrono::TimeDelta;
use tracing::debug;

// ── BlockAggregator ───────────────────────────────────────────────────────────

/// Groups resolved messages into sender blocks.
pub struct BlockAggregator {
    merge_window: TimeDelta,
}

impl Default for BlockAggregator {
    fn default() -> Self {
        Self::new(PipelineConfig::default().merge_window())
    }
}

impl BlockAggregator {
    /// Create an aggregator that merges same-sender messages at most
    /// `merge_window` apart.
    pub fn new(merge_window: TimeDelta) -> Self {
        Self { merge_window }
    }

    // ── Public methods ────────────────────────────────────────────────────────

    /// Merge `messages` into blocks in a single left-to-right pass.
    ///
    /// A new block starts when the sender changes or when the gap to the
    /// previous message is strictly greater than the merge window. A gap of
    /// exactly the window still merges.
    pub fn aggregate(&self, messages: &[Message]) -> Vec<Block> {
        let mut blocks: Vec<Block> = Vec::new();
        let mut current: Option<Block> = None;
        let mut prev: Option<&Message> = None;

        for msg in messages {
            let need_new = match prev {
                None => true,
                Some(p) => self.starts_new_block(p, msg),
            };

            if need_new {
                if let Some(block) = current.take() {
                    blocks.push(block);
                }
                current = Some(Self::open_block(msg));
            } else if let Some(ref mut block) = current {
                Self::extend_block(block, msg);
            }

            prev = Some(msg);
        }

        if let Some(block) = current {
            blocks.push(block);
        }

        debug!(
            "BlockAggregator: created {} blocks from {} messages",
            blocks.len(),
            messages.len()
        );
        blocks
    }

    // ── Block-building helpers ────────────────────────────────────────────────

    fn starts_new_block(&self, prev: &Message, msg: &Message) -> bool {
        msg.sender != prev.sender || (msg.datetime - prev.datetime) > self.merge_window
    }

    fn open_block(msg: &Message) -> Block {
        Block {
            datetime: msg.datetime,
            datetime_last: msg.datetime,
            sender: msg.sender.clone(),
            receiver: msg.receiver.clone(),
            chat: msg.chat.clone(),
            message: msg.message.clone(),
            n_block: 1,
            block_duration: TimeDelta::zero(),
        }
    }

    fn extend_block(block: &mut Block, msg: &Message) {
        block.message.push('\n');
        block.message.push_str(&msg.message);
        block.datetime_last = msg.datetime;
        block.n_block += 1;
        block.block_duration = block.datetime_last - block.datetime;
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
