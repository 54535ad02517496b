mod batch;
mod recipes;
mod schema;

pub use batch::{BatchOutcome, run_in_transaction};
pub use recipes::{
    QaFixUpdate, ensure_chef, insert_extracted_recipe, is_record_level, load_corpus, load_ingredient_relations,
    load_link_index, load_recipe, read_record_snapshot, update_qa_fix,
};
pub use schema::{count_rows, ensure_schema, open_corpus, open_corpus_read_only};
