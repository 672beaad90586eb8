//! Query context bookkeeping
//!
//! Reference: ncbi-blast/c++/include/algo/blast/core/blast_query_info.h

/// Context information for a single query context
///
/// NCBI reference: blast_query_info.h:60-73
/// ```c
/// typedef struct BlastContextInfo {
///     Int4 query_offset;      /**< Offset of this query, strand or frame */
///     Int4 query_length;      /**< Length of this query, strand or frame */
///     Int8 eff_searchsp;      /**< Effective search space for this context */
///     Int4 length_adjustment; /**< Length adjustment for boundary conditions */
///     Int4 query_index;       /**< Index of query (same for all frames) */
///     Int1 frame;             /**< Frame number (-1, -2, -3, 0, 1, 2, or 3) */
///     Boolean is_valid;        /**< Determine if this context is valid */
/// } BlastContextInfo;
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ContextInfo {
    /// Offset of this context in the concatenated guarded query
    pub query_offset: i32,
    /// Length of this context (no sentinels)
    pub query_length: i32,
    /// Effective search space for this context
    pub eff_searchsp: i64,
    /// Length adjustment for boundary conditions
    pub length_adjustment: i32,
    /// Index of query
    pub query_index: i32,
    /// Frame number; 0 for protein
    pub frame: i8,
    pub is_valid: bool,
}

/// Query information structure
#[derive(Clone, Debug, PartialEq)]
pub struct QueryInfo {
    pub first_context: i32,
    pub last_context: i32,
    pub num_queries: usize,
    pub contexts: Vec<ContextInfo>,
    pub max_length: u32,
    pub min_length: u32,
}

impl QueryInfo {
    /// Single protein query of `length` residues: one context spanning
    /// offsets `[0, length + 1]` of the guarded buffer
    pub fn new_single_protein(length: usize) -> Self {
        let context = ContextInfo {
            query_offset: 0,
            query_length: length as i32,
            eff_searchsp: 0,
            length_adjustment: 0,
            query_index: 0,
            frame: 0,
            is_valid: length > 0,
        };
        Self {
            first_context: 0,
            last_context: 0,
            num_queries: 1,
            contexts: vec![context],
            max_length: length as u32,
            min_length: length as u32,
        }
    }

    /// Offset one past the last residue of a context
    pub fn context_end(&self, context: usize) -> Option<i32> {
        self.contexts
            .get(context)
            .map(|c| c.query_offset + c.query_length + 1)
    }

    pub fn num_contexts(&self) -> usize {
        self.contexts.len()
    }
}
