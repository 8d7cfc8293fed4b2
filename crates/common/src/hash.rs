use std::io::{self, Read};

use blake2::{digest::typenum::U32, Blake2b, Digest};

/// Hash the concatenation of all `sources`, in the order they are yielded.
///
/// Sources are streamed into the hasher one at a time,
/// so that only a single source is open at any given moment.
pub fn blake2_concat<I, R>(sources: I) -> io::Result<[u8; 32]>
where
    I: IntoIterator<Item = io::Result<R>>,
    R: Read,
{
    let mut hasher = Blake2b::<U32>::new();

    for source in sources {
        io::copy(&mut source?, &mut hasher)?;
    }

    Ok(hasher.finalize().into())
}
