//! Standard lexical-table declarations.
//!
//! A WordNet-style lexicon stores words, their senses, the synonym sets the
//! senses point into, and the semantic links between synonym sets. This
//! module declares those four model classes — schemas and validations —
//! through a registry, so they share the active handle and follow switches.

use crate::model::ModelClass;
use crate::registry::ModelRegistry;
use crate::schema::{ColumnDef, TableSchema};
use lexdb_core::{Result, ValidationRule};
use std::sync::Arc;

/// Part-of-speech tags used by synsets: noun, verb, adjective, adverb,
/// adjective satellite.
pub const PART_OF_SPEECH_TAGS: [&str; 5] = ["n", "v", "a", "r", "s"];

/// The four standard lexical model classes.
#[derive(Debug, Clone)]
pub struct Lexicon {
    words: Arc<ModelClass>,
    senses: Arc<ModelClass>,
    synsets: Arc<ModelClass>,
    semlinks: Arc<ModelClass>,
}

impl Lexicon {
    /// Define the standard classes on a registry.
    pub fn define(registry: &ModelRegistry) -> Result<Self> {
        let words = registry.define("Word", "words");
        words.declare_schema(
            TableSchema::builder("words")
                .if_not_exists()
                .column(ColumnDef::integer("wordid").primary_key())
                .column(ColumnDef::text("lemma").not_null().unique())
                .build()?,
        );
        words.add_validation(ValidationRule::presence("lemma"));
        words.add_validation(ValidationRule::length("lemma", Some(1), Some(80)));
        words.add_validation(ValidationRule::format("lemma", r"^\S(.*\S)?$")?);

        let synsets = registry.define("Synset", "synsets");
        synsets.declare_schema(
            TableSchema::builder("synsets")
                .if_not_exists()
                .column(ColumnDef::integer("synsetid").primary_key())
                .column(ColumnDef::text("pos").not_null())
                .column(ColumnDef::text("definition"))
                .build()?,
        );
        synsets.add_validation(ValidationRule::presence("pos"));
        synsets.add_validation(ValidationRule::inclusion("pos", PART_OF_SPEECH_TAGS));
        synsets.add_validation(ValidationRule::length("definition", None, Some(2048)));

        let senses = registry.define("Sense", "senses");
        senses.declare_schema(
            TableSchema::builder("senses")
                .if_not_exists()
                .column(ColumnDef::integer("senseid").primary_key())
                .column(
                    ColumnDef::integer("wordid")
                        .not_null()
                        .references("words", "wordid"),
                )
                .column(
                    ColumnDef::integer("synsetid")
                        .not_null()
                        .references("synsets", "synsetid"),
                )
                .column(ColumnDef::integer("rank").default_value("0"))
                .build()?,
        );
        senses.add_validation(ValidationRule::presence("wordid"));
        senses.add_validation(ValidationRule::presence("synsetid"));

        let semlinks = registry.define("SemanticLink", "semlinks");
        semlinks.declare_schema(
            TableSchema::builder("semlinks")
                .if_not_exists()
                .column(
                    ColumnDef::integer("synset1id")
                        .not_null()
                        .references("synsets", "synsetid"),
                )
                .column(
                    ColumnDef::integer("synset2id")
                        .not_null()
                        .references("synsets", "synsetid"),
                )
                .column(ColumnDef::integer("linkid").not_null())
                .build()?,
        );
        semlinks.add_validation(ValidationRule::presence("synset1id"));
        semlinks.add_validation(ValidationRule::presence("synset2id"));
        semlinks.add_validation(ValidationRule::presence("linkid"));

        Ok(Self {
            words,
            senses,
            synsets,
            semlinks,
        })
    }

    /// Create every declared table on the active handle.
    ///
    /// Declarations use IF NOT EXISTS, so this is safe against an existing
    /// lexicon file.
    pub fn create_tables(&self) -> Result<()> {
        for class in self.classes() {
            class.create_table()?;
        }
        Ok(())
    }

    /// The word class.
    pub fn words(&self) -> &Arc<ModelClass> {
        &self.words
    }

    /// The sense class.
    pub fn senses(&self) -> &Arc<ModelClass> {
        &self.senses
    }

    /// The synset class.
    pub fn synsets(&self) -> &Arc<ModelClass> {
        &self.synsets
    }

    /// The semantic-link class.
    pub fn semlinks(&self) -> &Arc<ModelClass> {
        &self.semlinks
    }

    /// The classes, in definition order.
    pub fn classes(&self) -> [&Arc<ModelClass>; 4] {
        [&self.words, &self.synsets, &self.senses, &self.semlinks]
    }
}
