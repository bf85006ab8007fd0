//! External interface (§6, §1 non-goals): `PathResolver` is *consumed*
//! by this crate, not implemented by it. Path tokenization, `.`/`..`
//! folding, and symlink-depth limiting belong to the host's resolver;
//! this module only pins down the boundary it calls back across.

use crate::dir::DirEntry;
use crate::error::Result;
use crate::icb::Node;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedType {
    Dir,
    Reg,
}

/// Directory iteration as the resolver sees it: drive `visit` over a
/// directory node's entries, stopping early if `visit` returns `true`.
pub type IterateDirFn<'a> = dyn FnMut(&Node, &mut dyn FnMut(DirEntry) -> bool) -> Result<()> + 'a;

/// Symlink target decoding as the resolver sees it.
pub type ReadSymlinkFn<'a> = dyn FnMut(&Node) -> Result<String> + 'a;

/// Host-provided path resolver (§6 "PathResolver (consumed)").
pub trait PathResolver {
    fn find_file(
        &self,
        path: &str,
        root: &Node,
        iterate_dir: &mut IterateDirFn,
        read_symlink: &mut ReadSymlinkFn,
        expected_type: ExpectedType,
    ) -> Result<Node>;
}
