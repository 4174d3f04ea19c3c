use eth2::types::{BlockId, Committee, Epoch, SignedBeaconBlock, Slot, StateId};
use eth2::{BeaconNodeHttpClient, Error};
use std::future::Future;

/// The upstream provider of blocks and committees.
pub trait ChainSource {
    /// Fetch the block at `block_id`. Returns `Ok(None)` if no such block exists (yet).
    fn get_block(
        &self,
        block_id: BlockId,
    ) -> impl Future<Output = Result<Option<SignedBeaconBlock>, Error>>;

    /// Fetch committees from the head state.
    ///
    /// Without filters, the committees of the current epoch are returned.
    fn get_committees(
        &self,
        epoch: Option<Epoch>,
        slot: Option<Slot>,
    ) -> impl Future<Output = Result<Option<Vec<Committee>>, Error>>;
}

impl ChainSource for BeaconNodeHttpClient {
    async fn get_block(&self, block_id: BlockId) -> Result<Option<SignedBeaconBlock>, Error> {
        Ok(self
            .get_beacon_blocks(block_id)
            .await?
            .map(|response| response.data))
    }

    async fn get_committees(
        &self,
        epoch: Option<Epoch>,
        slot: Option<Slot>,
    ) -> Result<Option<Vec<Committee>>, Error> {
        Ok(self
            .get_beacon_states_committees(StateId::Head, slot, None, epoch)
            .await?
            .map(|response| response.data))
    }
}
