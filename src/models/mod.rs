// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque entité correspond à une table créée par db::create_schema.
//
// Liste des modules:
//   - accounts : Comptes admin / manager / engineer / user (colonne role)
//   - complaints : Plaintes, statut, assignation et pièces jointes
//   - pending_registrations : Inscriptions en attente de vérification OTP
//   - dto : Data Transfer Objects pour les requêtes et réponses API
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Pas de clés étrangères : les plaintes référencent les comptes par email
//
// ============================================================================

pub mod accounts;
pub mod complaints;
pub mod dto;
pub mod pending_registrations;
