//! Block extractor — one block in, one record per null-data output out.

use crate::script::output_payload;
use crate::types::{Block, NullDataRecord};

/// Extract every null-data record from `block`.
///
/// Records come out in transaction order, then output order.
pub fn extract_block(block: &Block) -> Vec<NullDataRecord> {
    block
        .transactions
        .iter()
        .flat_map(|tx| {
            tx.outputs.iter().filter_map(move |output| {
                output_payload(output).map(|data| NullDataRecord {
                    data,
                    output_index: output.n,
                    block_hash: block.hash.clone(),
                    tx_hash: tx.txid.clone(),
                    height: block.height,
                })
            })
        })
        .collect()
}
